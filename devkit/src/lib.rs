/*!
# LuCI Bridge DevKit - Stubs and Utilities for Development

Library easing bridge development without a real router:
- Scripted transport stub for tests without network access
- Canned router payload builders (login page, ubus batches, uci replies)
- Test harness wiring a bridge onto the stub
*/

pub mod payloads;
pub mod test_utils;
pub mod transport_stub;

pub use test_utils::TestHarness;
pub use transport_stub::{MockTransport, RecordedRequest};
