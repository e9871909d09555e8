use std::fmt;
use std::str::FromStr;

use url::Url;

use relay_api::RelayError;

pub const DEFAULT_MQTT_PORT: u16 = 1883;

/// Plain-TCP MQTT server address.
///
/// Accepts `mqtt://host[:port]`, `tcp://host[:port]` and bare
/// `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerAddress {
    pub host: String,
    pub port: u16,
}

impl FromStr for BrokerAddress {
    type Err = RelayError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        let with_scheme = if raw.contains("://") {
            raw.to_string()
        } else {
            format!("mqtt://{raw}")
        };
        let url = Url::parse(&with_scheme).map_err(|_| RelayError::BrokerAddress(raw.to_string()))?;

        if !matches!(url.scheme(), "mqtt" | "tcp") {
            return Err(RelayError::BrokerAddress(raw.to_string()));
        }
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| RelayError::BrokerAddress(raw.to_string()))?;

        Ok(Self {
            host: host.trim_start_matches('[').trim_end_matches(']').to_string(),
            port: url.port().unwrap_or(DEFAULT_MQTT_PORT),
        })
    }
}

impl fmt::Display for BrokerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "mqtt://[{}]:{}", self.host, self.port)
        } else {
            write!(f, "mqtt://{}:{}", self.host, self.port)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(raw: &str) -> BrokerAddress {
        raw.parse().unwrap()
    }

    #[test]
    fn mqtt_url_with_port() {
        assert_eq!(
            parse("mqtt://broker.local:1884"),
            BrokerAddress { host: "broker.local".into(), port: 1884 }
        );
    }

    #[test]
    fn default_port() {
        assert_eq!(parse("mqtt://localhost").port, 1883);
        assert_eq!(parse("tcp://10.0.0.5").port, 1883);
    }

    #[test]
    fn bare_host_and_port() {
        assert_eq!(parse("localhost:1999"), BrokerAddress { host: "localhost".into(), port: 1999 });
        assert_eq!(parse("localhost").port, 1883);
    }

    #[test]
    fn ipv6_host() {
        let addr = parse("mqtt://[::1]:1883");
        assert_eq!(addr.host, "::1");
        assert_eq!(addr.to_string(), "mqtt://[::1]:1883");
    }

    #[test]
    fn unsupported_schemes_rejected() {
        for raw in ["mqtts://secure:8883", "ws://broker/mqtt", "mqtt://"] {
            assert!(
                matches!(raw.parse::<BrokerAddress>(), Err(RelayError::BrokerAddress(_))),
                "{raw} accepted"
            );
        }
    }
}
