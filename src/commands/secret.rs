use anyhow::Result;
use inquire::Password;
use std::path::Path;

use crate::commands::validate_name;
use crate::secret::SecretManager;
use crate::workspace::ensure_project_directory;

pub fn execute_secret_gen_key(project_path: &Path) -> Result<()> {
    let project_root = ensure_project_directory(Some(project_path))?;
    let manager = SecretManager::new(&project_root)?;

    if manager.key_exists() {
        return Err(anyhow::anyhow!(
            "A secret key already exists. Delete .secret.key first to replace it (existing secrets will be lost)."
        ));
    }

    manager.generate_key()?;
    println!("Secret key written to .secret.key");
    Ok(())
}

pub fn execute_secret_set(key: &str, project_path: &Path) -> Result<()> {
    validate_name(key)?;

    let project_root = ensure_project_directory(Some(project_path))?;
    let manager = SecretManager::new(&project_root)?;

    let value = Password::new(&format!("Value for '{key}':"))
        .without_confirmation()
        .prompt()?;

    if value.is_empty() {
        println!("Cancelled.");
        return Ok(());
    }

    manager.set_secret(key, &value)?;
    println!("Stored secret '{key}'. Reference it as ${{secret.{key}}} in project.yml");
    Ok(())
}

pub fn execute_secret_list(project_path: &Path) -> Result<()> {
    let project_root = ensure_project_directory(Some(project_path))?;
    let manager = SecretManager::new(&project_root)?;

    let keys = manager.list_secrets()?;
    if keys.is_empty() {
        println!("No secrets stored.");
        return Ok(());
    }

    for key in keys {
        println!("{key}");
    }
    Ok(())
}

pub fn execute_secret_remove(key: &str, project_path: &Path) -> Result<()> {
    let project_root = ensure_project_directory(Some(project_path))?;
    let manager = SecretManager::new(&project_root)?;

    if manager.delete_secret(key)? {
        println!("Removed secret '{key}'");
    } else {
        println!("No secret named '{key}'");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_gen_key_refuses_to_overwrite() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        fs::write(temp_dir.path().join("project.yml"), "test")?;

        execute_secret_gen_key(temp_dir.path())?;
        let result = execute_secret_gen_key(temp_dir.path());

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("already exists"));

        Ok(())
    }

    #[test]
    fn test_secret_list_empty() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        fs::write(temp_dir.path().join("project.yml"), "test")?;

        execute_secret_list(temp_dir.path())?;

        Ok(())
    }
}
