use chrono::{DateTime, Utc};

#[derive(clap::Parser, Debug)]
#[clap(author, version, about, long_about = None)]
#[clap(arg_required_else_help = true)]
pub struct Args {
    /// Broker URL, or a comma-separated list of URLs to fail over between
    #[clap(long, env = "AMQP_URL", value_name = "URL")]
    pub url: String,

    /// Exchange to publish to
    #[clap(long, env = "AMQP_EXCHANGE")]
    pub exchange: Option<String>,

    /// Queue bound to the exchange
    #[clap(long, env = "AMQP_QUEUE")]
    pub queue: Option<String>,

    /// Routing key (defaults to the queue name)
    #[clap(long, env = "AMQP_ROUTINGKEY")]
    pub routing_key: Option<String>,

    /// Tag reported with every message
    #[clap(long, env = "AMQP_TAG")]
    pub tag: Option<String>,

    /// Client certificate (PEM) for amqps brokers
    #[clap(long, requires = "key")]
    pub cert: Option<std::path::PathBuf>,

    /// Client key (PKCS#8 PEM) for amqps brokers
    #[clap(long, requires = "cert")]
    pub key: Option<std::path::PathBuf>,

    /// Wait for the broker to confirm every message.
    #[clap(long)]
    pub confirm: bool,

    /// Try every broker before giving up on a message.
    #[clap(long)]
    pub exhaustive: bool,

    /// Add the severity to each message.
    #[clap(long)]
    pub severity: bool,

    /// Treat input lines as the container's stderr.
    #[clap(long)]
    pub stderr: bool,

    /// Identifier of the container whose output is shipped.
    #[clap(long, default_value = "")]
    pub container_id: String,

    /// Name of the container whose output is shipped.
    #[clap(long, default_value = "")]
    pub container_name: String,

    /// Image the container runs.
    #[clap(long, default_value = "")]
    pub image_name: String,

    /// Container creation time, RFC 3339. Defaults to now.
    #[clap(long, value_name = "TIME")]
    pub created: Option<DateTime<Utc>>,

    /// Host name to report instead of the kernel's.
    #[clap(long)]
    pub hostname: Option<String>,
}

impl Args {
    /// The driver option map these arguments describe.
    pub fn driver_options(&self) -> Vec<(&'static str, String)> {
        let mut options = vec![("amqp-url", self.url.clone())];
        let optional = [
            ("amqp-exchange", &self.exchange),
            ("amqp-queue", &self.queue),
            ("amqp-routingkey", &self.routing_key),
            ("amqp-tag", &self.tag),
        ];
        for (key, value) in optional {
            if let Some(value) = value {
                options.push((key, value.clone()));
            }
        }
        if let Some(cert) = &self.cert {
            options.push(("amqp-cert", cert.display().to_string()));
        }
        if let Some(key) = &self.key {
            options.push(("amqp-key", key.display().to_string()));
        }
        if self.confirm {
            options.push(("amqp-confirm", "true".to_string()));
        }
        if self.exhaustive {
            options.push(("amqp-failover", "exhaustive".to_string()));
        }
        if self.severity {
            options.push(("amqp-severity", "true".to_string()));
        }
        options
    }
}
