//! # Secret Generator
//!
//! Maintains the `secrets/` directory of per-component secret export files
//! and collects or generates the secret material each component needs before
//! a bootstrap run.
//!
//! Each component owns one JSON file of string keys/values. Prompted fields
//! show the current value and keep it when the operator enters nothing;
//! generated fields (random keys) are created when absent and recreated only
//! under `--regenerate`. The GitOps admin password is stored twice: plaintext
//! under the `installer` component (for the optional CLI login) and as a
//! bcrypt hash plus modification timestamp under `argocd` (what the
//! controller actually consumes).

use anyhow::{bail, Context, Result};
use rand::RngCore;
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing::info;

type ComponentSecrets = BTreeMap<String, BTreeMap<String, String>>;

/// Seam for operator interaction so the generator is testable without a TTY.
pub trait Prompt {
    /// Ask for a field value; `None` means "keep the current value"
    fn field(
        &mut self,
        component: &str,
        name: &str,
        description: &str,
        current: Option<&str>,
    ) -> Result<Option<String>>;

    /// Ask for file contents (by filename); `None` means "keep the current value"
    fn file_contents(
        &mut self,
        component: &str,
        name: &str,
        description: &str,
        current: Option<&str>,
    ) -> Result<Option<String>>;
}

/// Interactive [`Prompt`] reading from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl StdinPrompt {
    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .context("Failed to read from stdin")?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

impl Prompt for StdinPrompt {
    fn field(
        &mut self,
        component: &str,
        name: &str,
        description: &str,
        current: Option<&str>,
    ) -> Result<Option<String>> {
        print!(
            "[{component} {name}] ({description}): [current: {}] ",
            current.unwrap_or("")
        );
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let input = self.read_line()?;
        if input.is_empty() {
            Ok(None)
        } else {
            Ok(Some(input))
        }
    }

    fn file_contents(
        &mut self,
        component: &str,
        name: &str,
        description: &str,
        current: Option<&str>,
    ) -> Result<Option<String>> {
        println!("[{component} {name}] ({description})");
        println!("Current contents:\n{}", current.unwrap_or(""));
        print!("New filename with contents (empty to not change): ");
        std::io::stdout().flush().context("Failed to flush stdout")?;

        let filename = self.read_line()?;
        if filename.is_empty() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&filename)
            .with_context(|| format!("Failed to read {filename}"))?;
        Ok(Some(contents))
    }
}

/// Generates and persists per-component secret files.
pub struct SecretGenerator<'a> {
    environment: String,
    regenerate: bool,
    secrets_dir: PathBuf,
    secrets: ComponentSecrets,
    prompt: &'a mut dyn Prompt,
}

impl std::fmt::Debug for SecretGenerator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretGenerator")
            .field("environment", &self.environment)
            .field("regenerate", &self.regenerate)
            .field("secrets_dir", &self.secrets_dir)
            .finish()
    }
}

impl<'a> SecretGenerator<'a> {
    pub fn new(
        environment: &str,
        regenerate: bool,
        secrets_dir: PathBuf,
        prompt: &'a mut dyn Prompt,
    ) -> Self {
        Self {
            environment: environment.to_string(),
            regenerate,
            secrets_dir,
            secrets: ComponentSecrets::new(),
            prompt,
        }
    }

    /// Load existing component files. An absent directory is an empty set.
    pub fn load(&mut self) -> Result<()> {
        if !self.secrets_dir.is_dir() {
            return Ok(());
        }

        for entry in std::fs::read_dir(&self.secrets_dir)
            .with_context(|| format!("Failed to list {}", self.secrets_dir.display()))?
        {
            let entry = entry?;
            let component = entry.file_name().to_string_lossy().to_string();
            let raw = std::fs::read_to_string(entry.path())
                .with_context(|| format!("Failed to read {}", entry.path().display()))?;
            let parsed: BTreeMap<String, String> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", entry.path().display()))?;

            info!(component, "Loaded component secrets");
            self.secrets.insert(component, parsed);
        }

        Ok(())
    }

    /// Save each component back to its file, creating the directory if
    /// needed.
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.secrets_dir)
            .with_context(|| format!("Failed to create {}", self.secrets_dir.display()))?;

        for (component, values) in &self.secrets {
            let path = self.secrets_dir.join(component);
            let rendered = serde_json::to_string(values)
                .with_context(|| format!("Failed to serialize {component}"))?;
            std::fs::write(&path, rendered)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        Ok(())
    }

    /// Collect or generate every component's secret material.
    pub fn generate(&mut self) -> Result<()> {
        info!(environment = self.environment, "Generating component secrets");

        self.pull_secret()?;
        self.gitops_admin()?;

        self.input_field("cert-manager", "enabled", "Use cert-manager? (y/n):")?;
        let use_cert_manager = self
            .current("cert-manager", "enabled")
            .map(str::to_string);
        match use_cert_manager.as_deref() {
            Some("y") => self.cert_manager()?,
            Some("n") => self.ingress_nginx()?,
            other => bail!(
                "Invalid cert manager enabled value {}",
                other.unwrap_or("<unset>")
            ),
        }

        Ok(())
    }

    fn pull_secret(&mut self) -> Result<()> {
        self.input_file(
            "pull-secret",
            ".dockerconfigjson",
            ".docker/config.json to pull images",
        )
    }

    fn ingress_nginx(&mut self) -> Result<()> {
        self.input_file("ingress-nginx", "tls.key", "Certificate private key")?;
        self.input_file("ingress-nginx", "tls.crt", "Certificate chain")
    }

    fn cert_manager(&mut self) -> Result<()> {
        self.input_field("cert-manager", "email", "ACME registration email")
    }

    fn gitops_admin(&mut self) -> Result<()> {
        let current_password = self
            .current("installer", "argocd.admin.plaintext_password")
            .map(str::to_string);

        self.input_field(
            "installer",
            "argocd.admin.plaintext_password",
            "Admin password for ArgoCD?",
        )?;
        let new_password = self
            .current("installer", "argocd.admin.plaintext_password")
            .map(str::to_string)
            .unwrap_or_default();

        // Recompute the hash only when the plaintext changed; bcrypt salting
        // would otherwise churn the stored hash on every run.
        if current_password.as_deref() != Some(&new_password) || self.regenerate {
            let hash = bcrypt::hash(&new_password, bcrypt::DEFAULT_COST)
                .context("Failed to hash admin password")?;
            let mtime = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();

            self.set("argocd", "admin.password", hash);
            self.set("argocd", "admin.passwordMtime", mtime);
        }

        self.input_field(
            "argocd",
            "dex.clientSecret",
            "OAuth client secret for ArgoCD (either GitHub or Google)?",
        )?;

        self.set_generated("argocd", "server.secretkey", random_hex(16));

        Ok(())
    }

    fn input_field(&mut self, component: &str, name: &str, description: &str) -> Result<()> {
        let current = self.current(component, name).map(str::to_string);
        if let Some(value) =
            self.prompt
                .field(component, name, description, current.as_deref())?
        {
            self.set(component, name, value);
        }
        Ok(())
    }

    fn input_file(&mut self, component: &str, name: &str, description: &str) -> Result<()> {
        let current = self.current(component, name).map(str::to_string);
        if let Some(value) =
            self.prompt
                .file_contents(component, name, description, current.as_deref())?
        {
            self.set(component, name, value);
        }
        Ok(())
    }

    fn current(&self, component: &str, name: &str) -> Option<&str> {
        self.secrets
            .get(component)
            .and_then(|values| values.get(name))
            .map(String::as_str)
    }

    fn set(&mut self, component: &str, name: &str, value: String) {
        self.secrets
            .entry(component.to_string())
            .or_default()
            .insert(name.to_string(), value);
    }

    fn set_generated(&mut self, component: &str, name: &str, value: String) {
        if self.current(component, name).is_none() || self.regenerate {
            self.set(component, name, value);
        }
    }
}

fn random_hex(bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rand::rng().fill_bytes(&mut buf);
    buf.iter().map(|byte| format!("{byte:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted [`Prompt`] answering from a queue; `None` entries mean "keep".
    struct ScriptedPrompt {
        answers: std::collections::VecDeque<Option<String>>,
    }

    impl ScriptedPrompt {
        fn new(answers: Vec<Option<&str>>) -> Self {
            Self {
                answers: answers
                    .into_iter()
                    .map(|answer| answer.map(str::to_string))
                    .collect(),
            }
        }
    }

    impl Prompt for ScriptedPrompt {
        fn field(
            &mut self,
            _component: &str,
            _name: &str,
            _description: &str,
            _current: Option<&str>,
        ) -> Result<Option<String>> {
            Ok(self.answers.pop_front().flatten())
        }

        fn file_contents(
            &mut self,
            component: &str,
            name: &str,
            description: &str,
            current: Option<&str>,
        ) -> Result<Option<String>> {
            self.field(component, name, description, current)
        }
    }

    /// Answers for a full run: pull secret, admin password, dex secret,
    /// cert-manager choice, then the chosen branch's fields.
    fn full_run_answers() -> Vec<Option<&'static str>> {
        vec![
            Some("{\"auths\":{}}"),   // pull-secret .dockerconfigjson
            Some("hunter2"),          // installer admin password
            Some("oauth-secret"),     // argocd dex.clientSecret
            Some("n"),                // cert-manager enabled
            Some("key-material"),     // ingress-nginx tls.key
            Some("cert-material"),    // ingress-nginx tls.crt
        ]
    }

    #[test]
    fn test_full_run_populates_components() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::new(full_run_answers());
        let mut generator =
            SecretGenerator::new("minikube", false, dir.path().join("secrets"), &mut prompt);

        generator.load().unwrap();
        generator.generate().unwrap();
        generator.save().unwrap();

        let argocd: BTreeMap<String, String> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("secrets/argocd")).unwrap(),
        )
        .unwrap();

        assert!(argocd.contains_key("admin.password"));
        assert!(argocd.contains_key("admin.passwordMtime"));
        assert_eq!(argocd["dex.clientSecret"], "oauth-secret");
        assert_eq!(argocd["server.secretkey"].len(), 32);

        let ingress: BTreeMap<String, String> = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("secrets/ingress-nginx")).unwrap(),
        )
        .unwrap();
        assert_eq!(ingress["tls.key"], "key-material");
    }

    #[test]
    fn test_admin_password_hash_verifies() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::new(full_run_answers());
        let mut generator =
            SecretGenerator::new("minikube", false, dir.path().join("secrets"), &mut prompt);

        generator.generate().unwrap();

        let hash = generator.current("argocd", "admin.password").unwrap();
        assert!(bcrypt::verify("hunter2", hash).unwrap());
    }

    #[test]
    fn test_unchanged_password_keeps_hash() {
        let dir = tempfile::tempdir().unwrap();
        let secrets_dir = dir.path().join("secrets");

        let mut prompt = ScriptedPrompt::new(full_run_answers());
        let mut generator = SecretGenerator::new("minikube", false, secrets_dir.clone(), &mut prompt);
        generator.generate().unwrap();
        generator.save().unwrap();
        let first_hash = generator.current("argocd", "admin.password").unwrap().to_string();
        let first_key = generator.current("argocd", "server.secretkey").unwrap().to_string();

        // Second run: operator keeps everything (empty input all the way).
        let mut prompt = ScriptedPrompt::new(vec![None, None, None, None, None, None]);
        let mut generator = SecretGenerator::new("minikube", false, secrets_dir, &mut prompt);
        generator.load().unwrap();
        generator.generate().unwrap();

        assert_eq!(
            generator.current("argocd", "admin.password").unwrap(),
            first_hash
        );
        assert_eq!(
            generator.current("argocd", "server.secretkey").unwrap(),
            first_key
        );
    }

    #[test]
    fn test_regenerate_rotates_generated_fields_only() {
        let dir = tempfile::tempdir().unwrap();
        let secrets_dir = dir.path().join("secrets");

        let mut prompt = ScriptedPrompt::new(full_run_answers());
        let mut generator = SecretGenerator::new("minikube", false, secrets_dir.clone(), &mut prompt);
        generator.generate().unwrap();
        generator.save().unwrap();
        let first_key = generator.current("argocd", "server.secretkey").unwrap().to_string();

        let mut prompt = ScriptedPrompt::new(vec![None, None, None, None, None, None]);
        let mut generator = SecretGenerator::new("minikube", true, secrets_dir, &mut prompt);
        generator.load().unwrap();
        generator.generate().unwrap();

        assert_ne!(
            generator.current("argocd", "server.secretkey").unwrap(),
            first_key
        );
        assert_eq!(
            generator.current("argocd", "dex.clientSecret").unwrap(),
            "oauth-secret"
        );
    }

    #[test]
    fn test_invalid_cert_manager_choice_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::new(vec![
            Some("{}"),
            Some("hunter2"),
            Some("oauth-secret"),
            Some("maybe"),
        ]);
        let mut generator =
            SecretGenerator::new("minikube", false, dir.path().join("secrets"), &mut prompt);

        assert!(generator.generate().is_err());
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let secrets_dir = dir.path().join("secrets");

        let mut prompt = ScriptedPrompt::new(full_run_answers());
        let mut generator = SecretGenerator::new("minikube", false, secrets_dir.clone(), &mut prompt);
        generator.generate().unwrap();
        generator.save().unwrap();
        let saved = generator.secrets.clone();

        let mut prompt = ScriptedPrompt::new(Vec::new());
        let mut reloaded = SecretGenerator::new("minikube", false, secrets_dir, &mut prompt);
        reloaded.load().unwrap();

        assert_eq!(reloaded.secrets, saved);
    }

    #[test]
    fn test_random_hex_length_and_charset() {
        let value = random_hex(16);
        assert_eq!(value.len(), 32);
        assert!(value.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
