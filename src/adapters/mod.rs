//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `config_file`  | —                  | JSON config on disk         |
//! | `log_sink`     | StackCallbacks     | `log` facade                |
//! | `patch_file`   | PatchSource        | Text patch file             |
//! | `thread_timer` | CommandTimer       | `std::thread` + EngineQueue |
//! | `wake_pin`     | Transport          | `embedded-hal` output pin   |

pub mod config_file;
pub mod log_sink;
pub mod patch_file;
pub mod thread_timer;
pub mod wake_pin;
