//! Cloud document side of the agent.
//!
//! | Module         | Role                                              |
//! |----------------|---------------------------------------------------|
//! | `document`     | Paths, device/schedule views, ack and patches     |
//! | `subscription` | Cancellable snapshot feeds                        |
//! | `command`      | At-most-once command execution and acking         |
//! | `heartbeat`    | Periodic liveness marker                          |

pub mod command;
pub mod document;
pub mod heartbeat;
pub mod subscription;
