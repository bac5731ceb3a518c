//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                | Connects to                 |
//! |---------------|---------------------------|-----------------------------|
//! | `alarm_clock` | AlarmScheduler            | In-process timer table      |
//! | `device_id`   | –                         | Device and host identity    |
//! | `file_store`  | ConfigPort                | Postcard image on disk      |
//! |               | StoragePort               |                             |
//! | `host_device` | ScreenLockController      | Shell hooks                 |
//! |               | WakeController            |                             |
//! |               | ContentController         |                             |
//! |               | DisplaySettingsController |                             |
//! |               | UpdateInstaller           |                             |
//! |               | AlarmScheduler            | (delegates to alarm_clock)  |
//! | `json_docs`   | RemoteDocumentPort        | Directory of JSON documents |
//! | `log_sink`    | EventSink                 | `log` facade                |
//! | `time`        | TimePort                  | Host wall clock             |

pub mod alarm_clock;
pub mod device_id;
pub mod file_store;
pub mod host_device;
pub mod json_docs;
pub mod log_sink;
pub mod time;
