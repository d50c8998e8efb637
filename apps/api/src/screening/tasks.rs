use serde::{Deserialize, Serialize};

use crate::screening::prompts::{
    fill_slots, EVALUATION_TEMPLATE, MATCH_PERCENTAGE_TEMPLATE, MISSING_KEYWORDS_TEMPLATE,
    SKILL_IMPROVEMENT_TEMPLATE,
};

/// One of the four fixed analyses a session can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Evaluation,
    SkillImprovement,
    MissingKeywords,
    MatchPercentage,
}

impl Task {
    pub const ALL: [Task; 4] = [
        Task::Evaluation,
        Task::SkillImprovement,
        Task::MissingKeywords,
        Task::MatchPercentage,
    ];

    /// Tab title shown by clients.
    pub fn title(self) -> &'static str {
        match self {
            Task::Evaluation => "Evaluation",
            Task::SkillImprovement => "Improve Skills",
            Task::MissingKeywords => "Missing Keywords",
            Task::MatchPercentage => "Match %",
        }
    }

    pub fn template(self) -> &'static str {
        match self {
            Task::Evaluation => EVALUATION_TEMPLATE,
            Task::SkillImprovement => SKILL_IMPROVEMENT_TEMPLATE,
            Task::MissingKeywords => MISSING_KEYWORDS_TEMPLATE,
            Task::MatchPercentage => MATCH_PERCENTAGE_TEMPLATE,
        }
    }

    /// Only the match-percentage output carries a machine-readable line.
    pub fn yields_match_score(self) -> bool {
        matches!(self, Task::MatchPercentage)
    }
}

/// Builds the complete prompt for `task`. Pure; `jd` and `resume` are inserted verbatim.
pub fn compose(task: Task, jd: &str, resume: &str) -> String {
    fill_slots(task.template(), jd, resume)
}
