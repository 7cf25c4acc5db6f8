//! One-line console rendering of session events.

use x7_core::SessionEvent;

pub fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::StateChanged {
            state,
            reason: Some(reason),
        } => format!("state: {state} ({reason})"),
        SessionEvent::StateChanged { state, reason: None } => format!("state: {state}"),
        SessionEvent::RecordingChanged(true) => "recording: on".into(),
        SessionEvent::RecordingChanged(false) => "recording: off".into(),
        SessionEvent::StatusChanged(status) => {
            let low = if status.battery.is_low() { " (low)" } else { "" };
            format!(
                "battery: {}{low}, sd card: {}%",
                status.battery, status.sd_card_capacity
            )
        }
        SessionEvent::PreviewFrame(frame) => format!(
            "preview: {}x{} ({} bytes)",
            frame.width(),
            frame.height(),
            frame.jpeg().len()
        ),
    }
}
