use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// How the fake `disk-image-create` behaves once started.
#[derive(Debug, Clone, Copy)]
pub struct FakeToolBehaviour {
    /// Seconds to sleep before producing anything.
    pub sleep_secs: u32,
    /// Whether to create `<dest>.<format>` for every `-t` format.
    pub produce_outputs: bool,
}

impl Default for FakeToolBehaviour {
    fn default() -> Self {
        Self {
            sleep_secs: 0,
            produce_outputs: true,
        }
    }
}

/// A shell-script stand-in for `disk-image-create`.
///
/// It understands `-t <formats> -o <dest>`, records its argument vector and
/// touches the outputs the real tool would write. The script is run through
/// `sh` so it never has to be exec'd directly.
pub struct FakeBuildTool {
    script: PathBuf,
    argv_log: PathBuf,
}

impl FakeBuildTool {
    pub fn install(dir: &Path, behaviour: FakeToolBehaviour) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let script = dir.join("fake-disk-image-create");
        let argv_log = dir.join("fake-disk-image-create.argv");

        let produce = if behaviour.produce_outputs {
            "old_ifs=\"$IFS\"\nIFS=','\nfor f in $formats; do : > \"$dest.$f\"; done\nIFS=\"$old_ifs\"\n"
        } else {
            ""
        };

        let body = format!(
            "#!/bin/sh\n\
             printf '%s\\n' \"$@\" > '{argv}'\n\
             formats=''\n\
             dest=''\n\
             while [ $# -gt 0 ]; do\n\
             \x20 case \"$1\" in\n\
             \x20   -t) formats=\"$2\"; shift 2 ;;\n\
             \x20   -o) dest=\"$2\"; shift 2 ;;\n\
             \x20   *) shift ;;\n\
             \x20 esac\n\
             done\n\
             echo \"building $dest ($formats)\"\n\
             sleep {sleep}\n\
             {produce}\
             echo done\n",
            argv = argv_log.display(),
            sleep = behaviour.sleep_secs,
            produce = produce,
        );
        fs::write(&script, body)?;

        Ok(Self { script, argv_log })
    }

    /// Value for the `build_tool` config key.
    pub fn command(&self) -> String {
        format!("sh {}", self.script.display())
    }

    /// Arguments of the most recent invocation (after the script path).
    pub fn recorded_args(&self) -> Vec<String> {
        fs::read_to_string(&self.argv_log)
            .map(|s| s.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

/// SIGKILL `pid`; used to clean up long-sleeping fake builds.
pub fn kill_pid(pid: u32) {
    let _ = Command::new("kill").arg("-9").arg(pid.to_string()).status();
}
