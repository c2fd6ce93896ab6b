//! In-page scripts.
//!
//! Every script runs inside [`envelope`], which races it against the global
//! timeout and always resolves to a JSON string:
//!
//! - `{"ok": value}` on success
//! - `{"error": "message"}` if the script threw
//! - `{"timed_out": true}` if the timeout fired first
//!
//! The envelope never rejects, so the Rust side has exactly one resolution
//! point per call.

use std::time::Duration;

const ENVELOPE: &str = r#"(() => {
  const work = (async () => {
__BODY__
  })();
  const limit = new Promise((resolve) =>
    setTimeout(() => resolve({ timed_out: true }), __TIMEOUT_MS__)
  );
  return Promise.race([
    work.then((value) => ({ ok: value }), (err) => ({ error: String(err) })),
    limit,
  ]).then((reply) => JSON.stringify(reply));
})()"#;

/// Resolves once `document.readyState` is `complete`. Checks eagerly after
/// attaching the listener in case the state was reached before.
pub const AWAIT_READY: &str = r#"
    return await new Promise((resolve) => {
      const check = () => {
        if (document.readyState === 'complete') {
          document.removeEventListener('readystatechange', check);
          resolve(document.readyState);
        }
      };
      document.addEventListener('readystatechange', check);
      check();
    });
"#;

pub const IMAGE_ELEMENTS: &str = r#"
    return Array.from(document.querySelectorAll('img'), (img) => ({
      id: img.id || null,
      src: img.getAttribute('src') || '',
    }));
"#;

/// Hides the root overflow so scrollbars cannot steal layout width, measures,
/// then restores the page's own overflow value on every path.
pub const MEASURE: &str = r#"
    const root = document.documentElement;
    const previous = root.style.overflow;
    root.style.overflow = 'hidden';
    try {
      void root.offsetWidth;
      const widths = {};
      for (const img of document.querySelectorAll('img[id]')) {
        if (img.getClientRects().length === 0) continue;
        widths[img.id] = Math.round(img.getBoundingClientRect().width) + 'px';
      }
      return widths;
    } finally {
      root.style.overflow = previous;
    }
"#;

const APPLY: &str = r#"
    const attributes = __ATTRIBUTES__;
    const images = Array.from(document.querySelectorAll('img'));
    const missing = images
      .filter((img) => !Object.prototype.hasOwnProperty.call(attributes, img.id))
      .map((img) => img.id);
    if (missing.length > 0) {
      return { missing };
    }
    for (const img of images) {
      img.setAttribute('srcset', attributes[img.id].srcset);
      img.setAttribute('sizes', attributes[img.id].sizes);
    }
    const doctype = document.doctype
      ? new XMLSerializer().serializeToString(document.doctype) + '\n'
      : '';
    return { markup: doctype + document.documentElement.outerHTML };
"#;

/// Wrap a script body (an async function body using `return`) in the
/// timeout envelope.
pub fn envelope(body: &str, timeout: Duration) -> String {
    ENVELOPE
        .replace("__TIMEOUT_MS__", &timeout.as_millis().to_string())
        .replace("__BODY__", body)
}

/// Attribute-injection body with the compiled attributes embedded as a JSON
/// object literal.
pub fn apply(attributes_json: &str) -> String {
    APPLY.replace("__ATTRIBUTES__", attributes_json)
}
