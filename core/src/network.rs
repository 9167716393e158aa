//! NetworkSupervisor: keep the radio associated with the access point

use embassy_time::{Duration, Timer};

use crate::config::WifiCredentials;
use crate::schedule::{WIFI_CHECK_INTERVAL, WIFI_RETRY_BACKOFF};

/// Read-only view of the link state owned by the network driver
pub trait NetworkLink {
    /// Associated with the access point and holding an IP configuration
    fn is_associated(&self) -> bool;
}

impl<N: NetworkLink> NetworkLink for &N {
    fn is_associated(&self) -> bool {
        (**self).is_associated()
    }
}

/// Radio that can (re)join the configured access point
#[allow(async_fn_in_trait)]
pub trait WifiRadio: NetworkLink {
    type Error: core::fmt::Debug;

    async fn associate(&mut self, credentials: &WifiCredentials<'_>) -> Result<(), Self::Error>;
}

/// A client built on the first observation of an associated link and
/// kept for the rest of the process lifetime, whatever the link does later
pub struct OnceAssociated<N, F, T> {
    link: N,
    connect: Option<F>,
    client: Option<T>,
}

impl<N, F, T> OnceAssociated<N, F, T>
where
    N: NetworkLink,
    F: FnOnce() -> T,
{
    pub fn new(link: N, connect: F) -> Self {
        Self {
            link,
            connect: Some(connect),
            client: None,
        }
    }

    /// The client, or `None` while the link has never been up
    pub fn ready(&mut self) -> Option<&mut T> {
        if self.client.is_none() && self.link.is_associated() {
            self.client = self.connect.take().map(|connect| connect());
        }
        self.client.as_mut()
    }
}

/// Outcome of one supervisor check
#[derive(Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Supervision<E> {
    /// Already associated, nothing done
    Associated,
    /// Was down, association succeeded
    Joined,
    /// Was down, association failed
    JoinFailed(E),
}

impl<E> Supervision<E> {
    /// Delay before the next check
    pub fn next_delay(&self) -> Duration {
        match self {
            Supervision::Associated | Supervision::Joined => WIFI_CHECK_INTERVAL,
            Supervision::JoinFailed(_) => WIFI_RETRY_BACKOFF,
        }
    }
}

/// Check the link once; attempt association only when it is down
pub async fn supervise_once<R: WifiRadio>(
    radio: &mut R,
    credentials: &WifiCredentials<'_>,
) -> Supervision<R::Error> {
    if radio.is_associated() {
        return Supervision::Associated;
    }
    match radio.associate(credentials).await {
        Ok(()) => Supervision::Joined,
        Err(e) => Supervision::JoinFailed(e),
    }
}

/// Supervise forever; `report` sees every outcome (failures go no further)
pub async fn run_network_supervisor<R, F>(
    mut radio: R,
    credentials: WifiCredentials<'_>,
    mut report: F,
) -> !
where
    R: WifiRadio,
    F: FnMut(&Supervision<R::Error>),
{
    loop {
        let outcome = supervise_once(&mut radio, &credentials).await;
        report(&outcome);
        Timer::after(outcome.next_delay()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;
    use embassy_futures::block_on;

    const CREDENTIALS: WifiCredentials<'static> = WifiCredentials {
        ssid: "lab",
        psk: "secret",
    };

    struct FakeRadio {
        associated: bool,
        join_succeeds: bool,
        attempts: usize,
    }

    impl NetworkLink for FakeRadio {
        fn is_associated(&self) -> bool {
            self.associated
        }
    }

    impl WifiRadio for FakeRadio {
        type Error = &'static str;

        async fn associate(
            &mut self,
            credentials: &WifiCredentials<'_>,
        ) -> Result<(), Self::Error> {
            assert_eq!(credentials.ssid, "lab");
            self.attempts += 1;
            if self.join_succeeds {
                self.associated = true;
                Ok(())
            } else {
                Err("auth failed")
            }
        }
    }

    #[test]
    fn test_no_attempt_while_associated() {
        let mut radio = FakeRadio {
            associated: true,
            join_succeeds: true,
            attempts: 0,
        };
        for _ in 0..3 {
            let outcome = block_on(supervise_once(&mut radio, &CREDENTIALS));
            assert_eq!(outcome, Supervision::Associated);
            assert_eq!(outcome.next_delay(), Duration::from_secs(60));
        }
        assert_eq!(radio.attempts, 0);
    }

    #[test]
    fn test_successful_join_waits_full_interval() {
        let mut radio = FakeRadio {
            associated: false,
            join_succeeds: true,
            attempts: 0,
        };
        let outcome = block_on(supervise_once(&mut radio, &CREDENTIALS));
        assert_eq!(outcome, Supervision::Joined);
        assert!(outcome.next_delay() >= Duration::from_secs(60));

        // The next check finds the link up and does not rejoin
        assert_eq!(
            block_on(supervise_once(&mut radio, &CREDENTIALS)),
            Supervision::Associated
        );
        assert_eq!(radio.attempts, 1);
    }

    struct SwitchLink(Cell<bool>);

    impl NetworkLink for SwitchLink {
        fn is_associated(&self) -> bool {
            self.0.get()
        }
    }

    #[test]
    fn test_client_built_once_after_first_association() {
        let link = SwitchLink(Cell::new(false));
        let built = Cell::new(0);
        let mut gate = OnceAssociated::new(&link, || {
            built.set(built.get() + 1);
            "client"
        });

        assert!(gate.ready().is_none());
        assert!(gate.ready().is_none());
        assert_eq!(built.get(), 0);

        link.0.set(true);
        assert_eq!(gate.ready().copied(), Some("client"));

        // Kept even after the link drops again
        link.0.set(false);
        assert_eq!(gate.ready().copied(), Some("client"));
        assert_eq!(built.get(), 1);
    }

    #[test]
    fn test_failed_join_backs_off() {
        let mut radio = FakeRadio {
            associated: false,
            join_succeeds: false,
            attempts: 0,
        };
        let outcome = block_on(supervise_once(&mut radio, &CREDENTIALS));
        assert_eq!(outcome, Supervision::JoinFailed("auth failed"));
        assert_eq!(outcome.next_delay(), Duration::from_secs(10));
        assert_eq!(radio.attempts, 1);
    }
}
