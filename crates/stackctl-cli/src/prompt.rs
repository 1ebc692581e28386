use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use stackctl_core::{ConfirmPrompt, Prompter, ReminderChoice};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;

/// Asks the user on the terminal. `--yes` answers every question with
/// the safe default.
///
/// One line reader serves every question, so answers piped in ahead of
/// time are consumed in order.
pub(crate) struct TerminalPrompter<R = BufReader<Stdin>> {
    assume_yes: bool,
    stack_id: String,
    input: Mutex<Lines<R>>,
}

impl TerminalPrompter {
    pub(crate) fn new(assume_yes: bool, stack_id: &str) -> Self {
        Self::with_input(assume_yes, stack_id, BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> TerminalPrompter<R> {
    fn with_input(assume_yes: bool, stack_id: &str, input: R) -> Self {
        Self {
            assume_yes,
            stack_id: stack_id.to_string(),
            input: Mutex::new(input.lines()),
        }
    }

    fn default_download_path(&self) -> PathBuf {
        let stamp = chrono::Utc::now().format("%Y%m%d-%H%M%S");
        PathBuf::from(format!("{}-pv-pvc-{stamp}.tar.gz", self.stack_id))
    }

    /// Reads one answer. End of input reads as an empty answer.
    async fn ask(&self, question: &str) -> String {
        eprint!("{question} ");
        let _ = std::io::stderr().flush();

        match self.input.lock().await.next_line().await {
            Ok(Some(line)) => line.trim().to_string(),
            Ok(None) | Err(_) => String::new(),
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> Prompter for TerminalPrompter<R> {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        if self.assume_yes {
            return true;
        }
        let answer = self.ask(&format!("{} [y/N]", prompt.message)).await;
        matches!(answer.to_ascii_lowercase().as_str(), "y" | "yes")
    }

    async fn download_reminder(&self) -> ReminderChoice {
        let default_path = self.default_download_path();
        if self.assume_yes {
            // Taking both safety copies is the safe default
            return ReminderChoice::DownloadNow {
                destination: default_path,
            };
        }

        eprintln!("No local copy of the stack's volumes has been downloaded yet.");
        eprintln!("  [d] download one now, then attach with a server-side backup");
        eprintln!("  [s] attach without the server-side backup");
        eprintln!("  [c] cancel");
        loop {
            match self.ask("Choice [d/s/c]:").await.to_ascii_lowercase().as_str() {
                "d" => {
                    let path = self
                        .ask(&format!("Save to [{}]:", default_path.display()))
                        .await;
                    let destination = if path.is_empty() {
                        default_path
                    } else {
                        PathBuf::from(path)
                    };
                    return ReminderChoice::DownloadNow { destination };
                }
                "s" => return ReminderChoice::SkipServerBackup,
                "c" | "" => return ReminderChoice::Cancel,
                other => eprintln!("Unknown choice '{other}'"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use stackctl_core::TaskKind;

    use super::*;

    fn scripted(answers: &'static str) -> TerminalPrompter<&'static [u8]> {
        TerminalPrompter::with_input(false, "stack-1", answers.as_bytes())
    }

    fn attach_prompt() -> ConfirmPrompt {
        ConfirmPrompt {
            kind: TaskKind::Attach,
            message: "Attach efs-1?".to_string(),
        }
    }

    #[tokio::test]
    async fn test_piped_answers_reach_every_question() {
        let prompter = scripted("y\nd\n/tmp/volumes.tar.gz\n");

        assert!(prompter.confirm(&attach_prompt()).await);
        assert_eq!(
            prompter.download_reminder().await,
            ReminderChoice::DownloadNow {
                destination: PathBuf::from("/tmp/volumes.tar.gz")
            }
        );
    }

    #[tokio::test]
    async fn test_empty_path_uses_default_download_location() {
        let prompter = scripted("y\nd\n\n");

        assert!(prompter.confirm(&attach_prompt()).await);
        let ReminderChoice::DownloadNow { destination } = prompter.download_reminder().await else {
            panic!("expected a download");
        };
        assert!(destination.to_string_lossy().starts_with("stack-1-pv-pvc-"));
    }

    #[tokio::test]
    async fn test_exhausted_input_cancels() {
        let prompter = scripted("yes\n");

        assert!(prompter.confirm(&attach_prompt()).await);
        assert_eq!(prompter.download_reminder().await, ReminderChoice::Cancel);
    }
}
