//! C ABI surface (spec §6): the same JSON-in/JSON-out contract as the CLI,
//! for host apps that embed this crate as a static/dynamic library rather
//! than linking the Rust API directly.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use crate::engine::{determine, EngineInputs};

/// Runs one tick. `inputs_json` must be a NUL-terminated UTF-8 string
/// holding a serialized [`EngineInputs`]; the result is a NUL-terminated
/// UTF-8 JSON `Determination` or `{"error": "..."}` object. The returned
/// pointer is owned by the caller and must be released with
/// [`oref_free_string`].
///
/// # Safety
/// `inputs_json` must be a valid pointer to a NUL-terminated C string that
/// remains valid for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn oref_determine(inputs_json: *const c_char) -> *mut c_char {
    if inputs_json.is_null() {
        return error_json("null inputs pointer");
    }
    let text = match CStr::from_ptr(inputs_json).to_str() {
        Ok(t) => t,
        Err(_) => return error_json("inputs is not valid UTF-8"),
    };
    let inputs: EngineInputs = match serde_json::from_str(text) {
        Ok(i) => i,
        Err(e) => return error_json(&format!("invalid inputs JSON: {e}")),
    };
    match determine(&inputs) {
        Ok(d) => match serde_json::to_string(&d) {
            Ok(s) => to_c_string(s),
            Err(e) => error_json(&format!("failed to serialize determination: {e}")),
        },
        Err(e) => error_json(&e.to_string()),
    }
}

/// Releases a string previously returned by [`oref_determine`].
///
/// # Safety
/// `s` must be a pointer previously returned by `oref_determine` and not
/// already freed.
#[no_mangle]
pub unsafe extern "C" fn oref_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

fn error_json(message: &str) -> *mut c_char {
    let obj = serde_json::json!({ "error": message });
    to_c_string(obj.to_string())
}

fn to_c_string(s: String) -> *mut c_char {
    CString::new(s).unwrap_or_else(|_| CString::new("{\"error\":\"result contained a NUL byte\"}").unwrap()).into_raw()
}
