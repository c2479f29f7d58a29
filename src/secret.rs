use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use ring::aead::{
    AES_256_GCM, Aad, BoundKey, Nonce, NonceSequence, OpeningKey, SealingKey, UnboundKey,
};
use ring::rand::{SecureRandom, SystemRandom};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

struct CountingNonceSequence(u32);

impl NonceSequence for CountingNonceSequence {
    fn advance(&mut self) -> Result<Nonce, ring::error::Unspecified> {
        let mut nonce_bytes = [0u8; 12];
        nonce_bytes[8..].copy_from_slice(&self.0.to_be_bytes());
        self.0 += 1;
        Nonce::try_assume_unique_for_key(&nonce_bytes)
    }
}

/// Encrypted at-rest store for credentials the project config references via
/// `${secret.NAME}`, typically the functions API key.
pub struct SecretManager {
    key_file_path: PathBuf,
    secrets_file_path: PathBuf,
}

impl SecretManager {
    pub fn new(project_root: &Path) -> Result<Self> {
        let key_file_path = project_root.join(".secret.key");
        let secrets_file_path = project_root.join("secrets.yml");

        if let Some(parent) = key_file_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        Ok(Self {
            key_file_path,
            secrets_file_path,
        })
    }

    pub fn generate_key(&self) -> Result<()> {
        let mut key_bytes = [0u8; 32];
        let rng = SystemRandom::new();
        rng.fill(&mut key_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate random key"))?;

        let key_base64 = BASE64.encode(key_bytes);

        let key_content = format!(
            "# LeadFlow secret key file\n#\n# Encryption key for this project's secrets.yml.\n# Do NOT commit this file to version control.\n# All team members need the same key to read project secrets;\n# share it through encrypted channels only.\n# If lost, run 'lflow secret gen-key' again (existing secrets will be lost).\n\n{key_base64}\n"
        );

        fs::write(&self.key_file_path, key_content).with_context(|| {
            format!("Failed to write key file: {}", self.key_file_path.display())
        })?;

        Ok(())
    }

    pub fn key_exists(&self) -> bool {
        self.key_file_path.exists()
    }

    fn load_key(&self) -> Result<[u8; 32]> {
        if !self.key_exists() {
            return Err(anyhow::anyhow!(
                "Secret key not found. Run 'lflow secret gen-key' first."
            ));
        }

        let content = fs::read_to_string(&self.key_file_path).with_context(|| {
            format!("Failed to read key file: {}", self.key_file_path.display())
        })?;

        let key_line = content
            .lines()
            .find(|line| !line.trim().starts_with('#') && !line.trim().is_empty())
            .context("No valid key found in secret key file")?;

        let key_bytes = BASE64
            .decode(key_line.trim())
            .context("Failed to decode base64 key")?;

        if key_bytes.len() != 32 {
            return Err(anyhow::anyhow!("Invalid key length, expected 32 bytes"));
        }

        let mut key = [0u8; 32];
        key.copy_from_slice(&key_bytes);
        Ok(key)
    }

    fn encrypt(&self, data: &str) -> Result<String> {
        let key = self.load_key()?;
        let unbound_key = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| anyhow::anyhow!("Failed to create encryption key"))?;

        let mut nonce_bytes = [0u8; 12];
        let rng = SystemRandom::new();
        rng.fill(&mut nonce_bytes)
            .map_err(|_| anyhow::anyhow!("Failed to generate nonce"))?;

        let mut sealing_key = SealingKey::new(unbound_key, CountingNonceSequence(0));

        let mut in_out = data.as_bytes().to_vec();
        let tag = sealing_key
            .seal_in_place_separate_tag(Aad::empty(), &mut in_out)
            .map_err(|_| anyhow::anyhow!("Failed to encrypt data"))?;

        let mut payload = Vec::new();
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&in_out);
        payload.extend_from_slice(tag.as_ref());

        Ok(BASE64.encode(payload))
    }

    fn decrypt(&self, encrypted_data: &str) -> Result<String> {
        let key = self.load_key()?;
        let payload = BASE64
            .decode(encrypted_data.trim())
            .context("Failed to decode base64 encrypted data")?;

        // nonce (12) + tag (16)
        if payload.len() < 28 {
            return Err(anyhow::anyhow!("Invalid encrypted data: too short"));
        }

        let tag_start = payload.len() - 16;
        let ciphertext = &payload[12..tag_start];

        let unbound_key = UnboundKey::new(&AES_256_GCM, &key)
            .map_err(|_| anyhow::anyhow!("Failed to create decryption key"))?;
        let mut opening_key = OpeningKey::new(unbound_key, CountingNonceSequence(0));

        let mut ciphertext_and_tag = Vec::new();
        ciphertext_and_tag.extend_from_slice(ciphertext);
        ciphertext_and_tag.extend_from_slice(&payload[tag_start..]);

        let decrypted = opening_key
            .open_in_place(Aad::empty(), &mut ciphertext_and_tag)
            .map_err(|_| anyhow::anyhow!("Failed to decrypt data"))?;

        String::from_utf8(decrypted.to_vec()).context("Decrypted data is not valid UTF-8")
    }

    fn load_secrets(&self) -> Result<HashMap<String, String>> {
        if !self.secrets_file_path.exists() {
            return Ok(HashMap::new());
        }

        let yaml_content = fs::read_to_string(&self.secrets_file_path).with_context(|| {
            format!(
                "Failed to read secrets file: {}",
                self.secrets_file_path.display()
            )
        })?;

        if yaml_content.trim().is_empty() {
            return Ok(HashMap::new());
        }

        let encrypted: HashMap<String, String> =
            serde_yml::from_str(&yaml_content).context("Failed to parse secrets YAML")?;

        let mut secrets = HashMap::new();
        for (key, encrypted_value) in encrypted {
            secrets.insert(key, self.decrypt(&encrypted_value)?);
        }

        Ok(secrets)
    }

    fn save_secrets(&self, secrets: &HashMap<String, String>) -> Result<()> {
        let mut encrypted = HashMap::new();
        for (key, value) in secrets {
            encrypted.insert(key.clone(), self.encrypt(value)?);
        }

        let yaml_content =
            serde_yml::to_string(&encrypted).context("Failed to serialize secrets to YAML")?;

        fs::write(&self.secrets_file_path, yaml_content).with_context(|| {
            format!(
                "Failed to write secrets file: {}",
                self.secrets_file_path.display()
            )
        })?;

        Ok(())
    }

    pub fn get_secret(&self, key: &str) -> Result<Option<String>> {
        let secrets = self.load_secrets()?;
        Ok(secrets.get(key).cloned())
    }

    pub fn set_secret(&self, key: &str, value: &str) -> Result<()> {
        let mut secrets = self.load_secrets()?;
        secrets.insert(key.to_string(), value.to_string());
        self.save_secrets(&secrets)
    }

    pub fn delete_secret(&self, key: &str) -> Result<bool> {
        let mut secrets = self.load_secrets()?;
        let removed = secrets.remove(key).is_some();
        if removed {
            self.save_secrets(&secrets)?;
        }
        Ok(removed)
    }

    pub fn list_secrets(&self) -> Result<Vec<String>> {
        let secrets = self.load_secrets()?;
        let mut keys: Vec<String> = secrets.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_secret_roundtrip() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let manager = SecretManager::new(temp_dir.path())?;
        manager.generate_key()?;

        manager.set_secret("functions_key", "sk-test-value")?;

        assert_eq!(
            manager.get_secret("functions_key")?,
            Some("sk-test-value".to_string())
        );
        assert_eq!(manager.get_secret("missing")?, None);

        Ok(())
    }

    #[test]
    fn test_secret_value_not_stored_in_plaintext() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let manager = SecretManager::new(temp_dir.path())?;
        manager.generate_key()?;

        manager.set_secret("functions_key", "sk-test-value")?;

        let raw = fs::read_to_string(temp_dir.path().join("secrets.yml"))?;
        assert!(!raw.contains("sk-test-value"));

        Ok(())
    }

    #[test]
    fn test_set_secret_without_key_fails() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let manager = SecretManager::new(temp_dir.path())?;

        manager.set_secret("functions_key", "value").unwrap_err();

        Ok(())
    }

    #[test]
    fn test_delete_and_list_secrets() -> Result<()> {
        let temp_dir = tempfile::tempdir()?;
        let manager = SecretManager::new(temp_dir.path())?;
        manager.generate_key()?;

        manager.set_secret("b_key", "2")?;
        manager.set_secret("a_key", "1")?;

        assert_eq!(manager.list_secrets()?, vec!["a_key", "b_key"]);

        assert!(manager.delete_secret("a_key")?);
        assert!(!manager.delete_secret("a_key")?);
        assert_eq!(manager.list_secrets()?, vec!["b_key"]);

        Ok(())
    }
}
