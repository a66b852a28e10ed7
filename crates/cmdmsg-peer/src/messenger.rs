use std::io::{Cursor, Read, Write};

use bytes::{Bytes, BytesMut};
use cmdmsg_frame::{FrameConfig, FrameError, FrameReader, FrameWriter};
use cmdmsg_schema::{Command, CommandRef, CommandSpec, CommandTable, Value};
use tracing::{debug, warn};

use crate::dispatch::{Dispatcher, HandlerId, HandlerResult, UnknownCommand};
use crate::error::{PeerError, Result};
use crate::message::Message;

/// What [`Messenger::run`] does after a bad frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryPolicy {
    /// Log, skip to the next line separator and keep receiving.
    #[default]
    Resync,
    /// Return the error to the caller.
    Abort,
}

/// Sends and receives commands over a byte stream.
///
/// The stream is borrowed only for the duration of each call and nothing is
/// read beyond the current frame, so the stream may be handed to other code
/// between calls via [`Messenger::get_mut`].
#[derive(Debug)]
pub struct Messenger<S> {
    stream: S,
    commands: CommandTable,
    dispatcher: Dispatcher,
    config: FrameConfig,
}

impl<S> Messenger<S> {
    /// Create a messenger with default separators.
    pub fn new<I>(stream: S, commands: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<CommandSpec>,
    {
        Self::with_config(stream, commands, FrameConfig::default())
    }

    /// Create a messenger with explicit frame configuration.
    pub fn with_config<I>(stream: S, commands: I, config: FrameConfig) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<CommandSpec>,
    {
        config.separators.validate()?;
        let commands = CommandTable::new(commands)?;
        Self::with_table(stream, commands, config)
    }

    /// Create a messenger from an already-built command table.
    pub fn with_table(stream: S, commands: CommandTable, config: FrameConfig) -> Result<Self> {
        config.separators.validate()?;
        Ok(Self {
            stream,
            commands,
            dispatcher: Dispatcher::new(),
            config,
        })
    }

    /// Attach a handler to a command, by id or name.
    pub fn attach<'a, F>(
        &mut self,
        command: impl Into<CommandRef<'a>>,
        handler: F,
    ) -> Result<HandlerId>
    where
        F: FnMut(&Message) -> HandlerResult + Send + 'static,
    {
        let id = self.lookup(command.into())?.id();
        Ok(self.dispatcher.attach(id, handler))
    }

    /// Detach a handler. Returns whether anything was removed.
    pub fn detach(&mut self, id: HandlerId) -> bool {
        self.dispatcher.detach(id)
    }

    /// Replace the hook called for unhandled and unrecognized commands.
    pub fn on_unknown<F>(&mut self, hook: F)
    where
        F: FnMut(UnknownCommand<'_>) -> HandlerResult + Send + 'static,
    {
        self.dispatcher.on_unknown(hook);
    }

    /// The command table frames are resolved against.
    pub fn commands(&self) -> &CommandTable {
        &self.commands
    }

    /// Borrow the handler registry.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Mutably borrow the handler registry.
    pub fn dispatcher_mut(&mut self) -> &mut Dispatcher {
        &mut self.dispatcher
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Consume the messenger and return the inner stream.
    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Separators and size limits in use.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }

    fn lookup(&self, command: CommandRef<'_>) -> Result<&Command> {
        self.commands
            .resolve(command)
            .ok_or_else(|| PeerError::UnknownCommand(command.to_string()))
    }
}

impl<S: Write> Messenger<S> {
    /// Encode `args` with the command's parameter types and write one frame.
    pub fn send<'a>(&mut self, command: impl Into<CommandRef<'a>>, args: &[Value]) -> Result<()> {
        let command = self.lookup(command.into())?;
        let id = command.id();
        if args.len() != command.params().len() {
            return Err(PeerError::ArgumentCount {
                command: id,
                expected: command.params().len(),
                found: args.len(),
            });
        }

        let fields = command
            .params()
            .iter()
            .zip(args)
            .enumerate()
            .map(|(index, (ty, value))| {
                ty.encode(value).map_err(|source| PeerError::Encode {
                    command: id,
                    index,
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        FrameWriter::with_config(&mut self.stream, self.config).send(id, &fields)?;
        debug!(command = id, fields = fields.len(), "sent frame");
        Ok(())
    }
}

impl<S: Read> Messenger<S> {
    /// Read, decode and dispatch one frame (blocking).
    ///
    /// Returns the dispatched message, or `None` when the frame's command
    /// token matched no command and went to the unknown hook instead.
    pub fn receive(&mut self) -> Result<Option<Message>> {
        let table = &self.commands;
        let mut resolved = None;
        let frame = FrameReader::with_config(&mut self.stream, self.config).read_frame(|token| {
            resolved = table.resolve_token(token);
            resolved.map(Command::widths)
        })?;

        let (Some(command), Some(fields)) = (resolved, frame.fields) else {
            self.dispatcher.dispatch_unrecognized(&frame.command)?;
            return Ok(None);
        };

        let message = decode(command, &fields)?;
        debug!(command = message.command, args = message.args.len(), "received frame");
        self.dispatcher.dispatch(&message)?;
        Ok(Some(message))
    }

    /// Read one raw line, still escaped, through its line separator.
    pub fn read_line(&mut self) -> Result<Bytes> {
        Ok(FrameReader::with_config(&mut self.stream, self.config).read_line()?)
    }

    /// Read one line and dispatch it. See [`Messenger::dispatch_line`].
    pub fn receive_line(&mut self) -> Result<Option<Message>> {
        let line = self.read_line()?;
        self.dispatch_line(&line)
    }

    /// Skip to just past the next unescaped line separator. Returns the
    /// number of bytes discarded.
    pub fn resync(&mut self) -> Result<usize> {
        Ok(FrameReader::with_config(&mut self.stream, self.config).skip_frame()?)
    }

    /// Receive until the stream closes between frames.
    ///
    /// Handler failures and I/O errors always end the loop. Bad frames end
    /// it only under [`RecoveryPolicy::Abort`].
    pub fn run(&mut self, policy: RecoveryPolicy) -> Result<()> {
        loop {
            let err = match self.receive() {
                Ok(_) => continue,
                Err(PeerError::Frame(FrameError::ConnectionClosed)) => {
                    debug!("stream closed");
                    return Ok(());
                }
                Err(err) => err,
            };

            if policy == RecoveryPolicy::Abort || !err.is_recoverable() {
                return Err(err);
            }

            warn!(error = %err, "dropping bad frame");
            if !err.is_frame_complete() {
                match self.resync() {
                    Ok(discarded) => debug!(discarded, "resynchronized"),
                    Err(PeerError::Frame(FrameError::ConnectionClosed)) => return Ok(()),
                    Err(err) => return Err(err),
                }
            }
        }
    }
}

impl<S> Messenger<S> {
    /// Decode and dispatch a line that was already read off the stream.
    ///
    /// The line may omit its trailing separator. Only commands with text
    /// parameters can be handled this way; binary parameters are rejected
    /// with [`PeerError::BinaryInLineMode`]. Blank lines are ignored.
    ///
    /// Exactly one frame is dispatched per call. Anything after the first
    /// unescaped line separator is ignored; split such input with
    /// [`Messenger::read_line`] first.
    pub fn dispatch_line(&mut self, line: &[u8]) -> Result<Option<Message>> {
        if line.trim_ascii().is_empty() {
            return Ok(None);
        }

        // An extra separator terminates lines that lack one; a line that
        // already has one stops before it.
        let mut buf = BytesMut::with_capacity(line.len() + 1);
        buf.extend_from_slice(line);
        buf.extend_from_slice(&[self.config.separators.line]);

        let table = &self.commands;
        let mut resolved = None;
        let mut reader = FrameReader::with_config(Cursor::new(buf.freeze()), self.config);
        let frame = reader.read_frame(|token| {
            resolved = table.resolve_token(token);
            resolved
                .filter(|command| !command.has_binary_params())
                .map(Command::widths)
        })?;

        let message = match (resolved, frame.fields) {
            (Some(command), Some(fields)) => decode(command, &fields)?,
            (Some(command), None) => {
                return Err(PeerError::BinaryInLineMode {
                    command: command.id(),
                })
            }
            (None, _) => {
                self.dispatcher.dispatch_unrecognized(&frame.command)?;
                return Ok(None);
            }
        };

        debug!(command = message.command, args = message.args.len(), "dispatching line");
        self.dispatcher.dispatch(&message)?;
        Ok(Some(message))
    }
}

fn decode(command: &Command, fields: &[Bytes]) -> Result<Message> {
    let args = command
        .params()
        .iter()
        .zip(fields)
        .enumerate()
        .map(|(index, (ty, field))| {
            ty.decode(field).map_err(|source| PeerError::Decode {
                command: command.id(),
                index,
                source,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Message::new(command.id(), args))
}
