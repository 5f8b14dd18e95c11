/// SMTP connection probe for the settings screen. Builds a transport from
/// the active delivery configuration and verifies EHLO + authentication.
/// Never sends mail and never touches stored configuration or schedules.
use anyhow::Result;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::SmtpTransport;
use std::time::Duration;

use crate::models::configuration::DeliveryConfiguration;

pub fn test_connection(config: &DeliveryConfiguration) -> Result<bool> {
    // Trim whitespace that may sneak in from copied app passwords
    let clean_credential: String = config
        .smtp_credential
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let creds = Credentials::new(config.smtp_user.clone(), clean_credential);

    let builder = match SmtpTransport::relay(&config.smtp_host) {
        Ok(b) => b,
        Err(_) => SmtpTransport::builder_dangerous(&config.smtp_host),
    };

    let mut builder = builder
        .port(config.smtp_port)
        .authentication(vec![Mechanism::Plain, Mechanism::Login])
        .credentials(creds)
        .timeout(Some(Duration::from_secs(20)));

    if config.use_tls {
        let tls = TlsParameters::builder(config.smtp_host.clone()).build()?;
        // 465 expects implicit TLS; everything else negotiates STARTTLS
        builder = if config.smtp_port == 465 {
            builder.tls(Tls::Wrapper(tls))
        } else {
            builder.tls(Tls::Required(tls))
        };
    } else {
        builder = builder.tls(Tls::None);
    }

    let mailer = builder.build();
    Ok(mailer.test_connection()?)
}
