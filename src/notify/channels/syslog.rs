//! Syslog channel (RFC 5424 over UDP or TCP)

use std::future::Future;
use std::io;
use std::time::Duration;

use async_trait::async_trait;
use chrono::SecondsFormat;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpStream, UdpSocket};

use super::Channel;
use crate::alert::Level;
use crate::config::{SyslogChannelConfig, SyslogNetwork};
use crate::notify::error::ChannelError;
use crate::notify::message::Message;

pub struct SyslogChannel {
    name: String,
    network: SyslogNetwork,
    address: String,
    tag: String,
    facility: u8,
    timeout: Duration,
    hostname: String,
}

impl SyslogChannel {
    pub fn new(config: &SyslogChannelConfig) -> Result<Self, ChannelError> {
        if config.facility > 23 {
            return Err(ChannelError::Other(format!(
                "invalid syslog facility {}",
                config.facility
            )));
        }

        let hostname = std::env::var("HOSTNAME")
            .ok()
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "-".to_string());

        Ok(Self {
            name: config.name.clone(),
            network: config.network,
            address: config.address.clone(),
            tag: config.tag.clone(),
            facility: config.facility,
            timeout: config.timeout,
            hostname,
        })
    }

    fn severity(level: Level) -> u8 {
        match level {
            Level::Success => 6,
            Level::Warning => 4,
            Level::Error => 3,
        }
    }

    fn format_line(&self, message: &Message) -> String {
        let priority = u16::from(self.facility) * 8 + u16::from(Self::severity(message.level));
        format!(
            "<{}>1 {} {} {} {} - - {}",
            priority,
            message
                .timestamp
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            self.hostname,
            self.tag,
            std::process::id(),
            message.render_text().replace('\n', "; ")
        )
    }
}

#[async_trait]
impl Channel for SyslogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, message: &Message) -> Result<(), ChannelError> {
        let line = self.format_line(message);
        with_deadline(self.timeout, &self.address, self.deliver(&line)).await
    }
}

impl SyslogChannel {
    async fn deliver(&self, line: &str) -> io::Result<()> {
        match self.network {
            SyslogNetwork::Udp => {
                let socket = UdpSocket::bind("0.0.0.0:0").await?;
                socket.send_to(line.as_bytes(), &self.address).await?;
            }
            SyslogNetwork::Tcp => {
                let mut stream = TcpStream::connect(&self.address).await?;
                stream.write_all(line.as_bytes()).await?;
                stream.write_all(b"\n").await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }
}

/// Run `op` until `timeout`, reporting expiry as `TimedOut`
async fn with_deadline<T>(
    timeout: Duration,
    address: &str,
    op: impl Future<Output = io::Result<T>>,
) -> Result<T, ChannelError> {
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(ChannelError::Io(io::Error::new(
            io::ErrorKind::TimedOut,
            format!("syslog send to {} timed out after {:?}", address, timeout),
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::MessageOptions;
    use std::time::Duration;

    fn config(address: String, network: SyslogNetwork) -> SyslogChannelConfig {
        SyslogChannelConfig {
            name: "syslog".to_string(),
            network,
            address,
            tag: "lookout".to_string(),
            facility: 1,
            timeout: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_priority_from_level() {
        let channel = SyslogChannel::new(&config("127.0.0.1:514".into(), SyslogNetwork::Udp)).unwrap();
        let message = Message::new(Level::Error, "disk", "full", MessageOptions::new());

        let line = channel.format_line(&message);
        // facility user (1) * 8 + err (3)
        assert!(line.starts_with("<11>1 "));
        assert!(line.contains(" lookout "));
        assert!(line.ends_with("[ERROR] disk: full"));
    }

    #[test]
    fn test_invalid_facility() {
        let mut cfg = config("127.0.0.1:514".into(), SyslogNetwork::Udp);
        cfg.facility = 42;
        assert!(SyslogChannel::new(&cfg).is_err());
    }

    #[tokio::test]
    async fn test_udp_delivery() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let address = receiver.local_addr().unwrap().to_string();

        let channel = SyslogChannel::new(&config(address, SyslogNetwork::Udp)).unwrap();
        let message = Message::new(Level::Warning, "queue", "backlog", MessageOptions::new());
        channel.send(&message).await.unwrap();

        let mut buf = [0u8; 1024];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .unwrap()
            .unwrap();
        let line = std::str::from_utf8(&buf[..len]).unwrap();

        assert!(line.starts_with("<12>1 "));
        assert!(line.ends_with("[WARNING] queue: backlog"));
    }

    #[tokio::test]
    async fn test_tcp_delivery() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let channel = SyslogChannel::new(&config(address, SyslogNetwork::Tcp)).unwrap();
        let message = Message::new(Level::Success, "queue", "drained", MessageOptions::new());

        let (sent, accepted) = tokio::join!(channel.send(&message), async {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = String::new();
            tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut buf)
                .await
                .unwrap();
            buf
        });

        sent.unwrap();
        assert!(accepted.starts_with("<14>1 "));
        assert!(accepted.ends_with("[SUCCESS] queue: drained\n"));
    }

    #[tokio::test]
    async fn test_stalled_send_times_out() {
        let started = std::time::Instant::now();
        let err = with_deadline(
            Duration::from_millis(100),
            "10.255.255.1:601",
            std::future::pending::<io::Result<()>>(),
        )
        .await
        .unwrap_err();

        assert!(started.elapsed() < Duration::from_secs(2));
        match err {
            ChannelError::Io(e) => assert_eq!(e.kind(), io::ErrorKind::TimedOut),
            other => panic!("unexpected error: {}", other),
        }
    }
}
