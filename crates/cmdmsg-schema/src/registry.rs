use std::collections::HashMap;

use cmdmsg_frame::FieldWidth;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::types::{ParamType, WireKind};

/// Largest number of commands a table can hold; ids are 16-bit.
pub const MAX_COMMANDS: usize = u16::MAX as usize + 1;

/// One entry of the caller-supplied command list.
///
/// Deserializes from either a bare name (`"ping"`) or a descriptor
/// (`{"name": "pong", "params": ["i16"]}`). Descriptors may omit the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandSpec {
    Name(String),
    Full {
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        params: Vec<String>,
    },
}

impl CommandSpec {
    /// A command without parameters.
    pub fn named(name: impl Into<String>) -> Self {
        CommandSpec::Name(name.into())
    }

    /// A named command with parameter type names (canonical or alias).
    pub fn with_params<I, S>(name: impl Into<String>, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::Full {
            name: Some(name.into()),
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    /// A command reachable only by id.
    pub fn anonymous<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CommandSpec::Full {
            name: None,
            params: params.into_iter().map(Into::into).collect(),
        }
    }

    fn name(&self) -> Option<&str> {
        match self {
            CommandSpec::Name(name) => Some(name),
            CommandSpec::Full { name, .. } => name.as_deref(),
        }
    }

    fn params(&self) -> &[String] {
        match self {
            CommandSpec::Name(_) => &[],
            CommandSpec::Full { params, .. } => params,
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(name: &str) -> Self {
        CommandSpec::named(name)
    }
}

impl From<String> for CommandSpec {
    fn from(name: String) -> Self {
        CommandSpec::Name(name)
    }
}

/// A resolved command: id, optional name and ordered parameter types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    id: u16,
    name: Option<String>,
    params: Vec<ParamType>,
    widths: Vec<FieldWidth>,
}

impl Command {
    /// Position in the command list.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Name, if the command has one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Parameter types in wire order.
    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    /// Tokenizer widths, one per parameter.
    pub fn widths(&self) -> &[FieldWidth] {
        &self.widths
    }

    /// True when any parameter is a fixed-width binary type.
    pub fn has_binary_params(&self) -> bool {
        self.params
            .iter()
            .any(|ty| ty.wire_kind() == WireKind::Binary)
    }
}

/// Address a command by id or by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRef<'a> {
    Id(u16),
    Name(&'a str),
}

impl From<u16> for CommandRef<'_> {
    fn from(id: u16) -> Self {
        CommandRef::Id(id)
    }
}

impl<'a> From<&'a str> for CommandRef<'a> {
    fn from(name: &'a str) -> Self {
        CommandRef::Name(name)
    }
}

impl<'a> From<&'a String> for CommandRef<'a> {
    fn from(name: &'a String) -> Self {
        CommandRef::Name(name)
    }
}

impl std::fmt::Display for CommandRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandRef::Id(id) => write!(f, "#{id}"),
            CommandRef::Name(name) => f.write_str(name),
        }
    }
}

/// Immutable id- and name-addressable table of commands.
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<Command>,
    by_name: HashMap<String, u16>,
}

impl CommandTable {
    /// Build a table from an ordered command list. Ids follow list order.
    ///
    /// A name listed twice maps to its last occurrence.
    pub fn new<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<CommandSpec>,
    {
        let mut commands = Vec::new();
        let mut by_name = HashMap::new();

        for (index, entry) in entries.into_iter().enumerate() {
            let id = u16::try_from(index).map_err(|_| SchemaError::TooManyCommands {
                count: index + 1,
                max: MAX_COMMANDS,
            })?;
            let entry: CommandSpec = entry.into();

            let params = entry
                .params()
                .iter()
                .map(|type_name| {
                    ParamType::from_name(type_name).ok_or_else(|| SchemaError::UnknownType {
                        command: entry
                            .name()
                            .map_or_else(|| format!("#{id}"), str::to_string),
                        type_name: type_name.clone(),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            let widths = params.iter().map(|ty| ty.field_width()).collect();
            let name = entry.name().map(str::to_string);

            if let Some(name) = &name {
                by_name.insert(name.clone(), id);
            }
            commands.push(Command {
                id,
                name,
                params,
                widths,
            });
        }

        tracing::debug!(
            commands = commands.len(),
            named = by_name.len(),
            "command table built"
        );

        Ok(Self { commands, by_name })
    }

    /// Build a table from a JSON array of names and descriptors.
    pub fn from_json(json: &str) -> Result<Self> {
        let entries: Vec<CommandSpec> = serde_json::from_str(json)?;
        Self::new(entries)
    }

    /// Look a command up by id.
    pub fn get(&self, id: u16) -> Option<&Command> {
        self.commands.get(usize::from(id))
    }

    /// Look a command up by name.
    pub fn by_name(&self, name: &str) -> Option<&Command> {
        self.by_name.get(name).and_then(|id| self.get(*id))
    }

    /// Look a command up by id or name.
    pub fn resolve<'a>(&self, command: impl Into<CommandRef<'a>>) -> Option<&Command> {
        match command.into() {
            CommandRef::Id(id) => self.get(id),
            CommandRef::Name(name) => self.by_name(name),
        }
    }

    /// Resolve a command id token as read off the wire. Surrounding ASCII
    /// whitespace is ignored.
    pub fn resolve_token(&self, token: &[u8]) -> Option<&Command> {
        let text = std::str::from_utf8(token.trim_ascii()).ok()?;
        let id = text.parse::<u16>().ok()?;
        self.get(id)
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// True when the table holds no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Commands in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CommandTable {
        CommandTable::new([
            CommandSpec::named("ping"),
            CommandSpec::with_params("pong", ["i16"]),
            CommandSpec::with_params("sample", ["bi16", "float_sci", "s"]),
            CommandSpec::anonymous(["bool"]),
        ])
        .unwrap()
    }

    #[test]
    fn ids_follow_list_order() {
        let table = sample();
        assert_eq!(table.len(), 4);
        let ids: Vec<u16> = table.iter().map(Command::id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
        assert_eq!(table.by_name("pong").unwrap().id(), 1);
        assert_eq!(
            table.get(2).unwrap().params(),
            &[ParamType::ByteInt16, ParamType::FloatSci, ParamType::String]
        );
    }

    #[test]
    fn id_and_name_address_same_command() {
        let table = sample();
        assert_eq!(table.resolve(1u16), table.resolve("pong"));
        assert!(table.resolve("missing").is_none());
        assert!(table.resolve(4u16).is_none());
    }

    #[test]
    fn anonymous_commands_resolve_by_id_only() {
        let table = sample();
        let command = table.get(3).unwrap();
        assert_eq!(command.name(), None);
        assert_eq!(command.params(), &[ParamType::Bool]);
    }

    #[test]
    fn duplicate_names_map_to_last_occurrence() {
        let table = CommandTable::new(["led", "led"]).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.by_name("led").unwrap().id(), 1);
        assert_eq!(table.get(0).unwrap().name(), Some("led"));
    }

    #[test]
    fn unknown_type_fails_construction() {
        let err = CommandTable::new([CommandSpec::with_params("bad", ["int64"])]).unwrap_err();
        match err {
            SchemaError::UnknownType { command, type_name } => {
                assert_eq!(command, "bad");
                assert_eq!(type_name, "int64");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn too_many_commands_fails_construction() {
        let names = (0..=MAX_COMMANDS).map(|i| format!("c{i}"));
        let err = CommandTable::new(names).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::TooManyCommands {
                max: MAX_COMMANDS,
                ..
            }
        ));
    }

    #[test]
    fn full_id_space_fits() {
        let table = CommandTable::new((0..MAX_COMMANDS).map(|i| format!("c{i}"))).unwrap();
        assert_eq!(table.len(), MAX_COMMANDS);
        assert_eq!(table.get(u16::MAX).unwrap().name(), Some("c65535"));
    }

    #[test]
    fn token_resolution_tolerates_whitespace() {
        let table = sample();
        assert_eq!(table.resolve_token(b"1").unwrap().id(), 1);
        assert_eq!(table.resolve_token(b" 2\r\n").unwrap().id(), 2);
        assert!(table.resolve_token(b"").is_none());
        assert!(table.resolve_token(b"x").is_none());
        assert!(table.resolve_token(b"99").is_none());
        assert!(table.resolve_token(b"-1").is_none());
        assert!(table.resolve_token(&[0xFF]).is_none());
    }

    #[test]
    fn widths_follow_param_types() {
        let table = sample();
        assert!(table.get(2).unwrap().has_binary_params());
        assert!(!table.get(1).unwrap().has_binary_params());
        assert_eq!(
            table.get(2).unwrap().widths(),
            &[
                FieldWidth::Fixed(2),
                FieldWidth::Delimited,
                FieldWidth::Delimited
            ]
        );
    }

    #[test]
    fn load_from_json() {
        let table = CommandTable::from_json(
            r#"["ping", {"name": "pong", "params": ["i16"]}, {"params": ["bd", "es"]}]"#,
        )
        .unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.by_name("pong").unwrap().params(), &[ParamType::Int16]);
        assert_eq!(
            table.get(2).unwrap().params(),
            &[ParamType::ByteDouble, ParamType::EscapedString]
        );
    }

    #[test]
    fn command_list_survives_json() {
        let entries = vec![
            CommandSpec::named("ping"),
            CommandSpec::with_params("pong", ["i16"]),
            CommandSpec::anonymous(["bd", "es"]),
        ];
        let json = serde_json::to_string(&entries).unwrap();
        assert_eq!(
            json,
            r#"["ping",{"name":"pong","params":["i16"]},{"name":null,"params":["bd","es"]}]"#
        );

        let parsed: Vec<CommandSpec> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, entries);
        let table = CommandTable::from_json(&json).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.get(2).unwrap().name(), None);
    }

    #[test]
    fn invalid_json_rejected() {
        assert!(matches!(
            CommandTable::from_json("{not json"),
            Err(SchemaError::InvalidJson(_))
        ));
        assert!(matches!(
            CommandTable::from_json(r#"[{"name": "x", "params": ["nope"]}]"#),
            Err(SchemaError::UnknownType { .. })
        ));
    }

    #[test]
    fn empty_table() {
        let table = CommandTable::new(Vec::<CommandSpec>::new()).unwrap();
        assert!(table.is_empty());
        assert!(table.resolve_token(b"0").is_none());
    }
}
