//! netmap: turns a network scanner's text report into a versioned device
//! tree and a deterministic column layout.
//!
//! ARCHITECTURE
//! ============
//! Data flows one way: raw report → [`parse`] → tree → mutation loop in
//! [`session`] (each edit re-versions the touched node via [`version`]) →
//! [`layout`] → [`persist`] export → [`store`]. [`autosave`] debounces writes
//! around any caller-supplied save function, and [`state`] hosts one session
//! per network behind a single write lock.
//!
//! | Module      | Role                                               |
//! |-------------|----------------------------------------------------|
//! | `model`     | `TreeNode`, roles, parser output                   |
//! | `parse`     | Tolerant scanner-report parser                     |
//! | `clock`     | Injectable time source                             |
//! | `version`   | Creation stamps, version counters, bounded history |
//! | `tree`      | Lookup, walks, group bucketing                     |
//! | `positions` | Session-owned manual position index                |
//! | `session`   | Mutation flows over one network                    |
//! | `layout`    | Depth columns ordered by parent rank and ip        |
//! | `persist`   | Saved-layout documents                             |
//! | `store`     | Opaque get/put of documents by network id          |
//! | `autosave`  | Debounced and immediate saves                      |
//! | `state`     | Per-network sessions for a concurrent host         |
//! | `config`    | Environment-driven tuning                          |
//! | `error`     | Stable error codes                                 |

pub mod autosave;
pub mod clock;
pub mod config;
pub mod error;
pub mod layout;
pub mod model;
pub mod parse;
pub mod persist;
pub mod positions;
pub mod session;
pub mod state;
pub mod store;
pub mod tree;
pub mod version;
