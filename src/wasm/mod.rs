//! wasm-bindgen surface: the browser/Node entry point mirroring
//! [`crate::engine::determine`], for host apps running the core inside a
//! web view instead of linking the native library.

use wasm_bindgen::prelude::*;

use crate::engine::{determine, EngineInputs};

/// Runs one tick. `inputs` is a JS object matching [`EngineInputs`]'s JSON
/// shape; returns the `Determination` JS object or throws with the error
/// message.
#[wasm_bindgen(js_name = determine)]
pub fn determine_js(inputs: JsValue) -> Result<JsValue, JsValue> {
    let inputs: EngineInputs = serde_wasm_bindgen::from_value(inputs).map_err(|e| JsValue::from_str(&format!("invalid inputs: {e}")))?;
    let result = determine(&inputs).map_err(|e| JsValue::from_str(&e.to_string()))?;
    serde_wasm_bindgen::to_value(&result).map_err(|e| JsValue::from_str(&format!("failed to serialize determination: {e}")))
}
