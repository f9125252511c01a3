// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Built-in commands: `exit` and `cd`.

use std::env;
use std::path::PathBuf;

use crate::exec::ExecError;
use crate::parser::Pipeline;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Builtin {
    Exit,
    /// `cd` with no argument goes to `$HOME`.
    Cd(Vec<String>),
}

/// What the prompt loop does after a built-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

impl Builtin {
    /// Built-ins are recognised only as a lone command; inside a pipeline
    /// `cd` and `exit` are looked up on `PATH` like anything else.
    pub fn from_pipeline(pipeline: &Pipeline) -> Option<Self> {
        let [stage] = pipeline.stages.as_slice() else {
            return None;
        };
        match stage.program() {
            "exit" => Some(Builtin::Exit),
            "cd" => Some(Builtin::Cd(stage.args().to_vec())),
            _ => None,
        }
    }

    pub fn run(self) -> Result<Flow, ExecError> {
        match self {
            Builtin::Exit => Ok(Flow::Exit),
            Builtin::Cd(args) => {
                change_dir(&args)?;
                Ok(Flow::Continue)
            }
        }
    }
}

fn change_dir(args: &[String]) -> Result<(), ExecError> {
    let target = match args {
        [] => env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| ExecError::Cd("HOME not set".to_string()))?,
        [dir] => PathBuf::from(dir),
        _ => return Err(ExecError::Cd("too many arguments".to_string())),
    };
    env::set_current_dir(&target)
        .map_err(|e| ExecError::Cd(format!("{}: {}", target.display(), e)))?;
    tracing::debug!(dir = %target.display(), "changed directory");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_line;

    fn builtin(line: &str) -> Option<Builtin> {
        Builtin::from_pipeline(&parse_line(line).unwrap().unwrap())
    }

    #[test]
    fn recognises_builtins() {
        assert_eq!(builtin("exit"), Some(Builtin::Exit));
        assert_eq!(builtin("cd"), Some(Builtin::Cd(vec![])));
        assert_eq!(builtin("cd /tmp"), Some(Builtin::Cd(vec!["/tmp".to_string()])));
        assert_eq!(builtin("ls"), None);
        assert_eq!(builtin("cd /tmp | cat"), None);
    }

    #[test]
    fn exit_stops_the_loop() {
        assert_eq!(Builtin::Exit.run().unwrap(), Flow::Exit);
    }

    #[test]
    fn cd_argument_errors() {
        let err = Builtin::Cd(vec!["a".into(), "b".into()]).run().unwrap_err();
        assert_eq!(err.to_string(), "cd: too many arguments");

        let err = Builtin::Cd(vec!["/no/such/dir/for/slosh".into()]).run().unwrap_err();
        assert!(err.to_string().starts_with("cd: /no/such/dir/for/slosh: "));
    }
}
