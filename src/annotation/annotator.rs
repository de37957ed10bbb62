use tracing::info;

use super::connection::{ConnectionManager, NspTransport, NSP_COUNT};
use super::error::CommentError;
use super::marker::{EventKind, EventMarker};

/// Sends the marker for `kind` to every NSP, then closes all links if the
/// event ends the session.
///
/// A failed send stops the remaining sends and is returned, but a terminal
/// event still closes its links first. Closing is best-effort: every device
/// is closed in order and failures are only logged.
pub fn annotate<T: NspTransport>(
    links: &mut ConnectionManager<T>,
    kind: &EventKind,
    label: &str,
    extra_text: &str,
) -> Result<EventMarker, CommentError> {
    let marker = kind.marker(label, extra_text);
    let sent = send_to_all(links, kind, &marker);

    if marker.close_after {
        links.close_all();
    }

    sent.map(|()| marker)
}

fn send_to_all<T: NspTransport>(
    links: &mut ConnectionManager<T>,
    kind: &EventKind,
    marker: &EventMarker,
) -> Result<(), CommentError> {
    for device in 0..NSP_COUNT {
        let comment = marker.comment_for(device);
        links.set_comment(device, &comment, marker.color)?;
        info!(device, event = %kind, color = marker.color.name(), %comment, "sent NSP comment");
    }
    Ok(())
}
