//! WebAssembly bindings for NetSieve
//!
//! The host extension creates one [`NetSieve`] per browser profile, feeds it
//! the raw text of each filter list and forwards every request event to
//! `onBeforeRequest`. Fetching, persistence and badge rendering stay on the
//! JavaScript side.

use std::sync::Arc;

use ns_compiler::{compile_lists, ParseSummary};
use ns_core::{FilterEngine, InterceptionAdapter, RequestEvent, RequestKind};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct NetSieve {
    adapter: InterceptionAdapter,
}

#[wasm_bindgen]
impl NetSieve {
    /// `enabled` is the persisted toggle state.
    #[wasm_bindgen(constructor)]
    pub fn new(enabled: bool) -> NetSieve {
        NetSieve {
            adapter: InterceptionAdapter::new(Arc::new(FilterEngine::new(enabled))),
        }
    }

    /// Compile the given list texts (one string per list, in list order) and
    /// swap them in as the active rule set.
    #[wasm_bindgen(js_name = loadLists)]
    pub fn load_lists(&self, list_texts: JsValue) -> Result<JsValue, JsValue> {
        if !js_sys::Array::is_array(&list_texts) {
            return Err(JsValue::from_str("List texts must be an array of strings"));
        }
        let list_array = js_sys::Array::from(&list_texts);
        let mut texts = Vec::with_capacity(list_array.length() as usize);
        for value in list_array.iter() {
            let text = value
                .as_string()
                .ok_or_else(|| JsValue::from_str("List text must be a string"))?;
            texts.push(text);
        }

        let summaries = self.compile(&texts);
        let rule_set = self.engine().rule_set();

        let js_result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&js_result, &"rules".into(), &JsValue::from(rule_set.block_rules().len() as u32));
        let _ = js_sys::Reflect::set(&js_result, &"exceptions".into(), &JsValue::from(rule_set.exception_rules().len() as u32));

        let list_stats = js_sys::Array::new_with_length(summaries.len() as u32);
        for (i, summary) in summaries.iter().enumerate() {
            let stat = js_sys::Object::new();
            let _ = js_sys::Reflect::set(&stat, &"lines".into(), &JsValue::from(summary.lines as u32));
            let _ = js_sys::Reflect::set(&stat, &"rules".into(), &JsValue::from(summary.rules as u32));
            let _ = js_sys::Reflect::set(&stat, &"skipped".into(), &JsValue::from(summary.skipped() as u32));
            list_stats.set(i as u32, stat.into());
        }
        let _ = js_sys::Reflect::set(&js_result, &"lists".into(), &list_stats);

        web_sys::console::log_1(&JsValue::from_str(&format!(
            "NetSieve: {} rules, {} exceptions from {} lists",
            rule_set.block_rules().len(),
            rule_set.exception_rules().len(),
            summaries.len()
        )));

        Ok(js_result.into())
    }

    /// Returns `{cancel}` for the host's blocking request listener.
    #[wasm_bindgen(js_name = onBeforeRequest)]
    pub fn on_before_request(&self, url: &str, request_type: &str) -> JsValue {
        let cancel = self.should_cancel(url, request_type);
        let js_result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&js_result, &"cancel".into(), &JsValue::from(cancel));
        js_result.into()
    }

    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&self, enabled: bool) {
        self.engine().set_enabled(enabled);
    }

    #[wasm_bindgen(js_name = isEnabled)]
    pub fn is_enabled(&self) -> bool {
        self.engine().is_enabled()
    }

    /// `{blocked, allowed, totalBlocked, totalAllowed}`
    #[wasm_bindgen(js_name = getStats)]
    pub fn get_stats(&self) -> JsValue {
        let stats = self.engine().get_stats();
        let js_result = js_sys::Object::new();
        let _ = js_sys::Reflect::set(&js_result, &"blocked".into(), &JsValue::from(stats.session_blocked as f64));
        let _ = js_sys::Reflect::set(&js_result, &"allowed".into(), &JsValue::from(stats.session_allowed as f64));
        let _ = js_sys::Reflect::set(&js_result, &"totalBlocked".into(), &JsValue::from(stats.total_blocked as f64));
        let _ = js_sys::Reflect::set(&js_result, &"totalAllowed".into(), &JsValue::from(stats.total_allowed as f64));
        js_result.into()
    }

    /// Seed lifetime totals from host storage.
    #[wasm_bindgen(js_name = restoreStats)]
    pub fn restore_stats(&self, total_blocked: f64, total_allowed: f64) {
        self.engine()
            .stats()
            .restore_totals(to_count(total_blocked), to_count(total_allowed));
    }

    #[wasm_bindgen(js_name = resetSession)]
    pub fn reset_session(&self) {
        self.engine().stats().reset_session();
    }

    /// "active", "disabled" or "inactive"
    pub fn status(&self) -> String {
        self.engine().status().to_string()
    }
}

impl NetSieve {
    fn engine(&self) -> &FilterEngine {
        self.adapter.engine()
    }

    fn compile(&self, texts: &[String]) -> Vec<ParseSummary> {
        let (rule_set, summaries) = compile_lists(texts);
        self.engine().replace_rule_set(rule_set);
        summaries
    }

    fn should_cancel(&self, url: &str, request_type: &str) -> bool {
        let event = RequestEvent {
            url,
            is_navigation: RequestKind::from_resource_type(request_type) == RequestKind::MainDocument,
        };
        self.adapter.on_before_request(&event).cancel
    }
}

fn to_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value as u64
    } else {
        0
    }
}
