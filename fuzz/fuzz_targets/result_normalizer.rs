//! Fuzz test for host result normalization and view state restore.
//!
//! Both paths consume JSON the host controls, so neither may panic on
//! arbitrary input.

#![no_main]

use fourteeners_widgets_lib::catalog::WidgetKind;
use fourteeners_widgets_lib::host::ToolPayload;
use fourteeners_widgets_lib::model::ToolOutput;
use fourteeners_widgets_lib::view_state::ViewState;
use libfuzzer_sys::fuzz_target;
use serde_json::Value;

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<Value>(data) else {
        return;
    };

    for kind in WidgetKind::ALL {
        if let Ok(payload) = ToolPayload::normalize(kind.identifier(), value.clone()) {
            let _ = payload.require(kind.payload_key());
            let _ = ToolOutput::from_payload(kind, payload.into_value());
        }

        let restored = ViewState::restore(Some(&value), kind.supported_modes());
        // Whatever comes back must be displayable.
        assert!(restored.is_backed());
        assert!(kind.supports(restored.mode()));
    }
});
