use crate::annotation::connection::NspTransport;
use crate::annotation::marker::MarkerColor;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Open(usize, String),
    Comment(usize, String, MarkerColor),
    Close(usize),
}

/// In-memory stand-in for the NSP SDK. Records every call, and can be told
/// to refuse opening or closing one device, or to lose one device's link.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    calls: Vec<TransportCall>,
    fail_open: Option<usize>,
    fail_close: Option<usize>,
    drop_link: Option<usize>,
    down: Vec<usize>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_open(device: usize) -> Self {
        Self {
            fail_open: Some(device),
            ..Self::default()
        }
    }

    pub fn failing_close(device: usize) -> Self {
        Self {
            fail_close: Some(device),
            ..Self::default()
        }
    }

    /// `device` loses its link on its first comment. Comments to it fail
    /// until it is opened again.
    pub fn dropping_link(device: usize) -> Self {
        Self {
            drop_link: Some(device),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[TransportCall] {
        &self.calls
    }

    /// Comment texts sent so far, paired with their device.
    pub fn comments(&self) -> Vec<(usize, &str)> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Comment(device, text, _) => Some((*device, text.as_str())),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl NspTransport for RecordingTransport {
    fn open(&mut self, device: usize, address: &str) -> Result<(), String> {
        self.calls
            .push(TransportCall::Open(device, address.to_string()));
        if self.fail_open == Some(device) {
            return Err(format!("no route to {}", address));
        }
        self.down.retain(|&d| d != device);
        Ok(())
    }

    fn set_comment(
        &mut self,
        device: usize,
        comment: &str,
        color: MarkerColor,
    ) -> Result<(), String> {
        self.calls
            .push(TransportCall::Comment(device, comment.to_string(), color));
        if self.drop_link == Some(device) {
            self.drop_link = None;
            self.down.push(device);
        }
        if self.down.contains(&device) {
            return Err("link lost".to_string());
        }
        Ok(())
    }

    fn close(&mut self, device: usize) -> Result<(), String> {
        self.calls.push(TransportCall::Close(device));
        if self.fail_close == Some(device) {
            return Err("instrument did not acknowledge close".to_string());
        }
        Ok(())
    }
}
