use cmdmsg_schema::Value;

/// A decoded inbound command: its id and one value per declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub command: u16,
    pub args: Vec<Value>,
}

impl Message {
    /// A message for command `command` carrying decoded `args`.
    pub fn new(command: u16, args: Vec<Value>) -> Self {
        Self { command, args }
    }

    /// Argument at `index`, if present.
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    /// Take ownership of the decoded arguments.
    pub fn into_args(self) -> Vec<Value> {
        self.args
    }
}
