use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::error::CommentError;
use super::marker::MarkerColor;

/// Number of NSPs on the rig. Device indices run `0..NSP_COUNT`.
pub const NSP_COUNT: usize = 2;

pub const DEFAULT_ADDRESS_VARS: [&str; NSP_COUNT] = ["NSP1_IP", "NSP2_IP"];

// -----------------------------------------------------------------------------
// TRANSPORT
// -----------------------------------------------------------------------------

/// The three calls the core needs from the NSP SDK. Errors are the SDK's
/// own message.
pub trait NspTransport: Send {
    fn open(&mut self, device: usize, address: &str) -> Result<(), String>;

    fn set_comment(
        &mut self,
        device: usize,
        comment: &str,
        color: MarkerColor,
    ) -> Result<(), String>;

    fn close(&mut self, device: usize) -> Result<(), String>;
}

impl<T: NspTransport + ?Sized> NspTransport for Box<T> {
    fn open(&mut self, device: usize, address: &str) -> Result<(), String> {
        (**self).open(device, address)
    }

    fn set_comment(
        &mut self,
        device: usize,
        comment: &str,
        color: MarkerColor,
    ) -> Result<(), String> {
        (**self).set_comment(device, comment, color)
    }

    fn close(&mut self, device: usize) -> Result<(), String> {
        (**self).close(device)
    }
}

// -----------------------------------------------------------------------------
// ADDRESSES
// -----------------------------------------------------------------------------

/// Where the NSP addresses come from. Normally the environment, read fresh
/// on every `ensure_connections`; tests pin them instead.
#[derive(Debug, Clone)]
pub struct AddressSource {
    vars: [String; NSP_COUNT],
    fixed: Option<[Option<String>; NSP_COUNT]>,
}

impl AddressSource {
    pub fn env(vars: [String; NSP_COUNT]) -> Self {
        Self { vars, fixed: None }
    }

    pub fn fixed(addresses: [Option<String>; NSP_COUNT]) -> Self {
        Self {
            vars: DEFAULT_ADDRESS_VARS.map(String::from),
            fixed: Some(addresses),
        }
    }

    fn lookup(&self, device: usize) -> Option<String> {
        let value = match &self.fixed {
            Some(fixed) => fixed[device].clone(),
            None => std::env::var(&self.vars[device]).ok(),
        };
        // An empty variable is as good as a missing one.
        value.filter(|v| !v.trim().is_empty())
    }

    /// All addresses or the first one missing.
    pub fn resolve(&self) -> Result<[String; NSP_COUNT], CommentError> {
        let mut addresses: [String; NSP_COUNT] = Default::default();
        for (device, slot) in addresses.iter_mut().enumerate() {
            *slot = self
                .lookup(device)
                .ok_or_else(|| CommentError::MissingConfiguration {
                    var: self.vars[device].clone(),
                })?;
        }
        Ok(addresses)
    }
}

impl Default for AddressSource {
    fn default() -> Self {
        Self::env(DEFAULT_ADDRESS_VARS.map(String::from))
    }
}

/// What to do with links already opened when a later device fails to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionPolicy {
    /// Leave them open; the next terminal event closes them.
    #[default]
    KeepPartial,
    /// Close whatever this call opened before reporting the failure.
    FailTogether,
}

// -----------------------------------------------------------------------------
// CONNECTION MANAGER
// -----------------------------------------------------------------------------

pub struct ConnectionManager<T> {
    transport: T,
    addresses: AddressSource,
    policy: ConnectionPolicy,
    open: [bool; NSP_COUNT],
}

impl<T: NspTransport> ConnectionManager<T> {
    pub fn new(transport: T, addresses: AddressSource) -> Self {
        Self {
            transport,
            addresses,
            policy: ConnectionPolicy::default(),
            open: [false; NSP_COUNT],
        }
    }

    pub fn with_policy(mut self, policy: ConnectionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Makes sure every NSP has a live link, opening the ones that don't.
    ///
    /// Both addresses are resolved before anything is opened, so a missing
    /// one fails without touching the SDK. Links that are already open are
    /// left as they are.
    pub fn ensure_connections(&mut self) -> Result<[String; NSP_COUNT], CommentError> {
        let addresses = self.addresses.resolve()?;
        let mut opened_now = Vec::with_capacity(NSP_COUNT);

        for (device, address) in addresses.iter().enumerate() {
            if self.open[device] {
                debug!(device, "NSP link already open");
                continue;
            }

            match self.transport.open(device, address) {
                Ok(()) => {
                    info!(device, %address, "opened NSP link");
                    self.open[device] = true;
                    opened_now.push(device);
                }
                Err(reason) => {
                    warn!(device, %address, %reason, "issue opening NSP link");
                    if self.policy == ConnectionPolicy::FailTogether {
                        for opened in opened_now {
                            self.close_logged(opened);
                        }
                    }
                    return Err(CommentError::ConnectionFailure { device, reason });
                }
            }
        }

        Ok(addresses)
    }

    pub fn is_open(&self, device: usize) -> bool {
        self.open.get(device).copied().unwrap_or(false)
    }

    pub fn set_comment(
        &mut self,
        device: usize,
        comment: &str,
        color: MarkerColor,
    ) -> Result<(), CommentError> {
        if !self.is_open(device) {
            return Err(CommentError::Transmit {
                device,
                reason: "link is not open".to_string(),
            });
        }
        self.transport
            .set_comment(device, comment, color)
            .map_err(|reason| {
                // A failed comment means the link is gone. ensure_connections
                // reopens it on the next dispatch.
                warn!(device, %reason, "NSP comment failed, marking link closed");
                self.open[device] = false;
                CommentError::Transmit { device, reason }
            })
    }

    /// Closes one link. Closing a link that is not open does nothing. The
    /// link counts as closed afterwards even if the SDK complained.
    pub fn close(&mut self, device: usize) -> Result<(), CommentError> {
        if !self.is_open(device) {
            debug!(device, "NSP link not open, nothing to close");
            return Ok(());
        }
        self.open[device] = false;
        self.transport
            .close(device)
            .map_err(|reason| CommentError::ConnectionFailure { device, reason })?;
        info!(device, "closed NSP link");
        Ok(())
    }

    /// Closes every link in device order, logging failures instead of
    /// stopping at them.
    pub fn close_all(&mut self) {
        for device in 0..NSP_COUNT {
            self.close_logged(device);
        }
    }

    fn close_logged(&mut self, device: usize) {
        if let Err(e) = self.close(device) {
            warn!(device, error = %e, "failed to close NSP link");
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transports::memory::{RecordingTransport, TransportCall};

    fn both() -> AddressSource {
        AddressSource::fixed([Some("10.0.0.1".into()), Some("10.0.0.2".into())])
    }

    #[test]
    fn missing_address_fails_before_any_open() {
        for addresses in [
            [None, Some("10.0.0.2".to_string())],
            [Some("10.0.0.1".to_string()), None],
            [Some("10.0.0.1".to_string()), Some("  ".to_string())],
        ] {
            let mut links =
                ConnectionManager::new(RecordingTransport::new(), AddressSource::fixed(addresses));
            let err = links.ensure_connections().unwrap_err();
            assert!(matches!(err, CommentError::MissingConfiguration { .. }));
            assert!(links.transport().calls().is_empty());
        }
    }

    #[test]
    fn missing_address_names_the_variable() {
        let mut links = ConnectionManager::new(
            RecordingTransport::new(),
            AddressSource::fixed([Some("10.0.0.1".into()), None]),
        );
        match links.ensure_connections().unwrap_err() {
            CommentError::MissingConfiguration { var } => assert_eq!(var, "NSP2_IP"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn opens_each_device_once() {
        let mut links = ConnectionManager::new(RecordingTransport::new(), both());

        let addresses = links.ensure_connections().unwrap();
        assert_eq!(addresses, ["10.0.0.1".to_string(), "10.0.0.2".to_string()]);
        links.ensure_connections().unwrap();

        assert_eq!(
            links.transport().calls(),
            &[
                TransportCall::Open(0, "10.0.0.1".into()),
                TransportCall::Open(1, "10.0.0.2".into()),
            ]
        );
        assert!(links.is_open(0) && links.is_open(1));
    }

    #[test]
    fn failed_open_keeps_sibling_by_default() {
        let mut links = ConnectionManager::new(RecordingTransport::failing_open(1), both());

        match links.ensure_connections().unwrap_err() {
            CommentError::ConnectionFailure { device, .. } => assert_eq!(device, 1),
            other => panic!("unexpected error: {other}"),
        }
        assert!(links.is_open(0));
        assert!(!links.is_open(1));
        links.set_comment(0, "still here", MarkerColor::Blue).unwrap();
    }

    #[test]
    fn failed_open_closes_sibling_when_failing_together() {
        let mut links = ConnectionManager::new(RecordingTransport::failing_open(1), both())
            .with_policy(ConnectionPolicy::FailTogether);

        assert!(links.ensure_connections().is_err());
        assert!(!links.is_open(0));
        assert_eq!(
            links.transport().calls().last(),
            Some(&TransportCall::Close(0))
        );
    }

    #[test]
    fn close_is_idempotent() {
        let mut links = ConnectionManager::new(RecordingTransport::new(), both());
        links.close(0).unwrap();
        links.ensure_connections().unwrap();
        links.close(1).unwrap();
        links.close(1).unwrap();

        let closes = links
            .transport()
            .calls()
            .iter()
            .filter(|call| matches!(call, TransportCall::Close(_)))
            .count();
        assert_eq!(closes, 1);
    }

    #[test]
    fn failed_comment_reopens_only_that_link() {
        let mut links = ConnectionManager::new(RecordingTransport::dropping_link(1), both());
        links.ensure_connections().unwrap();

        let err = links.set_comment(1, "x", MarkerColor::Green).unwrap_err();
        assert!(matches!(err, CommentError::Transmit { device: 1, .. }));
        assert!(links.is_open(0));
        assert!(!links.is_open(1));

        links.transport_mut().clear();
        links.ensure_connections().unwrap();
        assert_eq!(
            links.transport().calls(),
            &[TransportCall::Open(1, "10.0.0.2".into())]
        );
        links.set_comment(1, "y", MarkerColor::Green).unwrap();
    }

    #[test]
    fn comment_on_closed_link_is_refused() {
        let mut links = ConnectionManager::new(RecordingTransport::new(), both());
        let err = links.set_comment(0, "x", MarkerColor::White).unwrap_err();
        assert!(matches!(err, CommentError::Transmit { device: 0, .. }));
    }
}
