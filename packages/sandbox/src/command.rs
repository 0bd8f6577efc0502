// ABOUTME: Structured launch commands for the sandboxed program
// ABOUTME: Builds argument vectors with an explicit stdin attachment instead of shell strings

/// Redirect script run by `/bin/sh`; the input path and the program argv are
/// passed as positional parameters and never spliced into the script text.
const STDIN_REDIRECT_SCRIPT: &str = r#"input="$1"; shift; exec "$@" < "$input""#;

/// Program argv plus an optional stdin file, both as paths inside the sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    program: Vec<String>,
    stdin_file: Option<String>,
}

impl LaunchCommand {
    pub fn new(program: Vec<String>) -> Self {
        Self {
            program,
            stdin_file: None,
        }
    }

    /// Run `source` with `interpreter`
    pub fn interpreter(interpreter: &str, source: &str) -> Self {
        Self::new(vec![interpreter.to_string(), source.to_string()])
    }

    /// Feed the program's standard input from `path`
    pub fn with_stdin_file(mut self, path: impl Into<String>) -> Self {
        self.stdin_file = Some(path.into());
        self
    }

    /// Final container argv
    pub fn to_argv(&self) -> Vec<String> {
        match &self.stdin_file {
            None => self.program.clone(),
            Some(input) => {
                let mut argv = vec![
                    "/bin/sh".to_string(),
                    "-c".to_string(),
                    STDIN_REDIRECT_SCRIPT.to_string(),
                    // $0
                    "sh".to_string(),
                    input.clone(),
                ];
                argv.extend(self.program.iter().cloned());
                argv
            }
        }
    }
}
