//! Outbound transport used by the session's connect phase.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::time::Duration;

use tokio::net::TcpStream;

use crate::DIAL_TIMEOUT;

/// A boxed future returned by [`Dialer::dial`].
pub type DialFuture<'a> = Pin<Box<dyn Future<Output = io::Result<TcpStream>> + Send + 'a>>;

/// Opens the TCP connection to the Hub.
///
/// One call is one attempt; retrying is the session's job.
pub trait Dialer: Send + Sync + 'static {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> DialFuture<'a>;
}

/// Plain TCP dialer with a per-attempt timeout.
#[derive(Debug, Clone)]
pub struct TcpDialer {
    pub timeout: Duration,
}

impl Default for TcpDialer {
    fn default() -> Self {
        Self {
            timeout: DIAL_TIMEOUT,
        }
    }
}

impl Dialer for TcpDialer {
    fn dial<'a>(&'a self, host: &'a str, port: u16) -> DialFuture<'a> {
        Box::pin(async move {
            let stream =
                match tokio::time::timeout(self.timeout, TcpStream::connect((host, port))).await {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(io::Error::new(
                            io::ErrorKind::TimedOut,
                            "connection attempt timed out",
                        ));
                    }
                };
            stream.set_nodelay(true)?;
            Ok(stream)
        })
    }
}
