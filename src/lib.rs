// Repligate - CORS forwarding proxy for the Replicate API
//
// Browser pages cannot call api.replicate.com directly: the API does not
// answer CORS preflights, so the browser blocks the request before it
// leaves the page. Repligate sits in between. It validates the
// caller-supplied destination against a single allowed upstream prefix,
// relays the request with a minimal header set, and stamps every response
// (success or failure) with permissive CORS headers.

pub mod cli;
pub mod config;
pub mod proxy;
