//! Typed command messaging over serial byte streams.
//!
//! Each message is one frame: a decimal command id followed by typed fields,
//! separated by `,` and terminated by `;`, with `/` escaping reserved bytes.
//! Commands are declared once as an ordered list of names and parameter
//! types; ids follow list order.
//!
//! # Crate Structure
//!
//! - [`frame`]: Separators, escaping and the byte-at-a-time frame tokenizer
//! - [`schema`]: Parameter type codecs and the command table
//! - [`peer`]: Handler dispatch and the `Messenger` (behind `peer` feature)
//!
//! ```no_run
//! use cmdmsg::peer::Messenger;
//! use cmdmsg::schema::CommandSpec;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let port = std::fs::OpenOptions::new()
//!     .read(true)
//!     .write(true)
//!     .open("/dev/ttyACM0")?;
//! let mut messenger = Messenger::new(
//!     port,
//!     [
//!         CommandSpec::named("ping"),
//!         CommandSpec::with_params("pong", ["int16"]),
//!     ],
//! )?;
//! messenger.attach("pong", |message| {
//!     println!("pong {:?}", message.args);
//!     Ok(())
//! })?;
//! messenger.send("ping", &[])?;
//! messenger.receive()?;
//! # Ok(())
//! # }
//! ```

/// Re-export frame types.
pub mod frame {
    pub use cmdmsg_frame::*;
}

/// Re-export schema types.
pub mod schema {
    pub use cmdmsg_schema::*;
}

/// Re-export peer types (requires `peer` feature).
#[cfg(feature = "peer")]
pub mod peer {
    pub use cmdmsg_peer::*;
}
