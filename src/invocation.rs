//! Argument list construction. Nothing here touches the filesystem or spawns.

/// Builds `[executable, extra_args..., flag, code_1, flag, code_2, ...]`.
pub fn build_invocation(
    executable: &str,
    define_flag: &str,
    injected_code: &[String],
    extra_args: &[String],
) -> Vec<String> {
    Invocation::new(executable)
        .args(extra_args.iter().cloned())
        .inject_all(define_flag, injected_code.iter().cloned())
        .into_args()
}

/// Incremental form of [`build_invocation`] with trailing positional arguments.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    executable: String,
    args: Vec<String>,
    injected: Vec<String>,
    trailing: Vec<String>,
}

impl Invocation {
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Passes `code` after `flag`, e.g. `-d 'x=1'`.
    pub fn inject(mut self, flag: &str, code: impl Into<String>) -> Self {
        self.injected.push(flag.to_string());
        self.injected.push(code.into());
        self
    }

    pub fn inject_all<I, S>(self, flag: &str, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        codes.into_iter().fold(self, |inv, code| inv.inject(flag, code))
    }

    /// Positional arguments placed after every injected definition.
    pub fn trailing(mut self, arg: impl Into<String>) -> Self {
        self.trailing.push(arg.into());
        self
    }

    pub fn into_args(self) -> Vec<String> {
        std::iter::once(self.executable)
            .chain(self.args)
            .chain(self.injected)
            .chain(self.trailing)
            .collect()
    }
}
