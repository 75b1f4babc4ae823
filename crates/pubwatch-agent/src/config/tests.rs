#[cfg(test)]
mod tests {
    use super::super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.catalog.base_url, "https://inspirehep.net/api/literature");
        assert_eq!(config.catalog.author, "Joseph.Karpie.1");
        assert_eq!(config.catalog.page_size, 250);
        assert_eq!(config.artifact.base_url, "https://arxiv.org/pdf/");
        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.mail.smtp_host, "smtp.gmail.com");
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.state.path, "previous_publications.csv");
        assert_eq!(config.state.commit_policy, CommitPolicy::AllNewArrivals);
    }

    #[test]
    fn test_partial_sections_keep_field_defaults() {
        let config = Config::from_toml_str(
            r#"
            [mail]
            from = "watcher@example.org"
            to = "reader@example.org"

            [state]
            commit_policy = "delivered_only"
            "#,
        )
        .unwrap();
        assert_eq!(config.mail.smtp_port, 587);
        assert_eq!(config.mail.author_display_name, "Joseph");
        assert_eq!(config.state.path, "previous_publications.csv");
        assert_eq!(config.state.commit_policy, CommitPolicy::DeliveredOnly);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_unknown_commit_policy_rejected() {
        let err = Config::from_toml_str("[state]\ncommit_policy = \"sometimes\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_validate_requires_mail_addresses() {
        let config = Config::default();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mail.from"));

        let mut config = Config::default();
        config.mail.from = "watcher@example.org".into();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("mail.to"));
    }

    #[test]
    fn test_secrets_required() {
        let missing = Secrets::from_lookup(|name| {
            (name == GENAI_KEY_VAR).then(|| "key".to_string())
        });
        let err = missing.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains(MAIL_PASSWORD_VAR));

        let secrets = Secrets::from_lookup(|name| Some(format!("{name}-value"))).unwrap();
        assert_eq!(secrets.genai_api_key.expose_secret(), "GOOGLE_GENAI_API_KEY-value");
        assert_eq!(secrets.mail_password.expose_secret(), "GOOGLE_EMAIL_APPWORD-value");
    }

    #[test]
    fn test_blank_secret_is_missing() {
        let result = Secrets::from_lookup(|_| Some("  ".to_string()));
        assert!(result.is_err());
    }
}
