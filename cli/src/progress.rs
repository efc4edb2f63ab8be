//! Console progress reporter

use colloquy_application::PipelineProgress;
use colloquy_domain::{AgentId, Mode};
use colored::Colorize;

/// Prints pipeline progress to stderr with light decoration.
pub struct ConsoleProgress {
    plain: bool,
}

impl ConsoleProgress {
    pub fn new(plain: bool) -> Self {
        Self { plain }
    }

    fn line(&self, decorated: String, plain: String) {
        if self.plain {
            eprintln!("{plain}");
        } else {
            eprintln!("{decorated}");
        }
    }
}

impl PipelineProgress for ConsoleProgress {
    fn on_pipeline_start(&self, mode: Mode, steps: &[AgentId]) {
        let names: Vec<&str> = steps.iter().map(|id| id.as_str()).collect();
        self.line(
            format!(
                "{} {} {}",
                "colloquy".bold(),
                format!("[{mode}]").dimmed(),
                mode.description().dimmed()
            ),
            format!("colloquy [{mode}] {}", mode.description()),
        );
        self.line(
            format!("  {}", names.join(" -> ").dimmed()),
            format!("  {}", names.join(" -> ")),
        );
    }

    fn on_agent_start(&self, agent: AgentId) {
        self.line(
            format!("  {} {} thinking...", "*".cyan(), agent.as_str().bold()),
            format!("  * {} thinking...", agent),
        );
    }

    fn on_agent_complete(&self, agent: AgentId, degraded: bool) {
        if degraded {
            self.line(
                format!("  {} {} degraded", "!".yellow(), agent.as_str().bold()),
                format!("  ! {agent} degraded"),
            );
        } else {
            self.line(
                format!("  {} {} done", "+".green(), agent.as_str().bold()),
                format!("  + {agent} done"),
            );
        }
    }

    fn on_gate_rejected(&self, agent: AgentId, reason: &str) {
        self.line(
            format!("  {} {} gate: {}", "!".red(), agent.as_str().bold(), reason),
            format!("  ! {agent} gate: {reason}"),
        );
    }

    fn on_deliberation_round(&self, round: u32) {
        self.line(
            format!("{} round {}", "deliberation".magenta().bold(), round),
            format!("deliberation round {round}"),
        );
    }

    fn on_retrieval_complete(&self, question_id: &str, sources: usize) {
        self.line(
            format!(
                "    {} {} {} source(s)",
                "~".blue(),
                question_id.dimmed(),
                sources
            ),
            format!("    ~ {question_id} {sources} source(s)"),
        );
    }
}
