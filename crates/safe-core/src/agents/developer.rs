use safe_llm::CompletionProvider;
use serde::{Deserialize, Serialize};

use super::{list_or, Agent, Checkpoint};
use crate::backlog::{BacklogItem, PLANNING_DEFAULT_POINTS};
use crate::change::ChangeRequest;
use crate::classifier::{Intent, ReplyClassifier};
use crate::error::Result;
use crate::types::AgentRole;

/// Stand-up reply when the developer has nothing in progress.
pub const NO_TASKS_REPLY: &str = "No tasks currently in progress.";

/// Impediment recorded when a progress report reads as blocked.
pub const IMPEDIMENT_MARKER: &str = "Potential impediment detected in status update";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeveloperState {
    /// Unique by item name.
    pub current_tasks: Vec<BacklogItem>,
    pub completed_tasks: Vec<BacklogItem>,
    /// Unique notes.
    pub technical_debt: Vec<String>,
    pub skills: Vec<String>,
}

impl Default for DeveloperState {
    fn default() -> Self {
        Self {
            current_tasks: Vec::new(),
            completed_tasks: Vec::new(),
            technical_debt: Vec::new(),
            skills: ["coding", "testing", "design", "refactoring"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

pub struct Developer {
    agent: Agent,
    state: DeveloperState,
}

impl Developer {
    pub fn new(provider: Box<dyn CompletionProvider>) -> Self {
        let role = AgentRole::Developer;
        Self {
            agent: Agent::new(role, system_prompt(role.display_name()), provider),
            state: DeveloperState::default(),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut Agent {
        &mut self.agent
    }

    pub fn state(&self) -> &DeveloperState {
        &self.state
    }

    pub fn current_tasks(&self) -> &[BacklogItem] {
        &self.state.current_tasks
    }

    pub fn technical_debt(&self) -> &[String] {
        &self.state.technical_debt
    }

    /// Story-point estimate read from the reply, defaulting to 5.
    pub fn estimate(
        &mut self,
        story: &BacklogItem,
        classifier: &dyn ReplyClassifier,
    ) -> Result<(u32, String)> {
        let prompt = format!(
            "As a Developer, estimate this user story:\n\n\
             Story: {}\n\
             Description: {}\n\
             Acceptance Criteria: {}\n\n\
             Team skills: {}\n\
             Known technical debt: {}\n\n\
             Please:\n\
             1. Analyze how complex the story is\n\
             2. Consider technical risks and dependencies\n\
             3. Give a story point estimate on the scale 1, 2, 3, 5, 8, 13, 20\n\
             4. Explain the reasoning behind the estimate\n\
             5. List any clarifications you need",
            story.name,
            story.description_or_default(),
            story.criteria_or_default(),
            self.state.skills.join(", "),
            list_or(&self.state.technical_debt, "None noted"),
        );
        let reply = self.agent.respond(prompt)?;
        let points = classifier
            .classify(Intent::Estimate, &reply)
            .points()
            .unwrap_or(PLANNING_DEFAULT_POINTS);
        Ok((points, reply))
    }

    /// Take `task` into the current-task set (idempotent by item name).
    pub fn start_work(&mut self, task: &BacklogItem) -> Result<String> {
        let prompt = format!(
            "As a Developer, you are starting work on this task:\n\n\
             Task: {}\n\
             Description: {}\n\
             Acceptance Criteria: {}\n\n\
             Please:\n\
             1. Outline your implementation approach\n\
             2. Name the key components or classes involved\n\
             3. Call out likely technical challenges\n\
             4. Describe how you will test it\n\
             5. Estimate how long implementation will take",
            task.name,
            task.description_or_default(),
            task.criteria_or_default(),
        );
        let reply = self.agent.respond(prompt)?;
        if !self.state.current_tasks.iter().any(|t| t.same_item(task)) {
            self.state.current_tasks.push(task.clone());
        }
        Ok(reply)
    }

    /// Stand-up update plus an impediment marker when the reply reads as
    /// blocked. With nothing in progress no provider call is made.
    pub fn report_progress(
        &mut self,
        classifier: &dyn ReplyClassifier,
    ) -> Result<(String, Option<String>)> {
        if self.state.current_tasks.is_empty() {
            return Ok((NO_TASKS_REPLY.to_string(), None));
        }
        let tasks: Vec<String> = self
            .state
            .current_tasks
            .iter()
            .map(|t| t.name.clone())
            .collect();
        let prompt = format!(
            "As a Developer in the daily stand-up, report on your progress.\n\n\
             Current tasks: {}\n\
             Technical debt items: {}\n\n\
             Give a short update covering:\n\
             1. What you finished since yesterday\n\
             2. What you will work on today\n\
             3. Anything blocking you\n\n\
             Keep it brief, as in a real stand-up.",
            tasks.join(", "),
            list_or(&self.state.technical_debt, "None noted"),
        );
        let reply = self.agent.respond(prompt)?;
        let impediment = classifier
            .classify(Intent::Impediment, &reply)
            .is_present()
            .then(|| IMPEDIMENT_MARKER.to_string());
        Ok((reply, impediment))
    }

    /// Move `task` to completed. Returns a technical-debt note when the
    /// reply mentions debt or refactoring.
    pub fn complete_task(
        &mut self,
        task: &BacklogItem,
        classifier: &dyn ReplyClassifier,
    ) -> Result<(String, Option<String>)> {
        let prompt = format!(
            "As a Developer, you have completed this task:\n\n\
             Task: {}\n\
             Description: {}\n\
             Acceptance Criteria: {}\n\n\
             Please:\n\
             1. Summarize what you implemented\n\
             2. Show how each acceptance criterion is met\n\
             3. Describe the testing you did\n\
             4. Point out any technical debt introduced or noticed\n\
             5. Note documentation or knowledge transfer still needed",
            task.name,
            task.description_or_default(),
            task.criteria_or_default(),
        );
        let reply = self.agent.respond(prompt)?;

        self.state.current_tasks.retain(|t| !t.same_item(task));
        self.state.completed_tasks.push(task.clone());

        let debt = classifier
            .classify(Intent::TechnicalDebt, &reply)
            .is_present()
            .then(|| format!("Technical debt related to {}", task.name));
        if let Some(note) = &debt {
            if !self.state.technical_debt.contains(note) {
                self.state.technical_debt.push(note.clone());
            }
        }
        Ok((reply, debt))
    }

    pub fn provide_technical_input(&mut self, topic: &str) -> Result<String> {
        let prompt = format!(
            "As a Developer on a SAFe team, share your technical expertise on this topic:\n\n\
             Topic: {topic}\n\n\
             Please:\n\
             1. Explain the technical considerations involved\n\
             2. Recommend an approach grounded in sound engineering practice\n\
             3. Weigh the trade-offs between alternatives\n\
             4. Relate the answer to SAFe principles where it helps\n\
             5. Keep the guidance specific and actionable"
        );
        self.agent.respond(prompt)
    }

    pub fn handle_change_request(
        &mut self,
        change: &ChangeRequest,
        current_task: &BacklogItem,
    ) -> Result<String> {
        let prompt = format!(
            "As a Developer, respond to a change request that arrived while you are mid-task:\n\n\
             Current task: {}\n\
             Current task description: {}\n\n\
             Change request: {}\n\
             Urgency: {}\n\n\
             Please:\n\
             1. Assess the technical impact of the change\n\
             2. Estimate the extra effort it needs\n\
             3. Identify risks or dependencies it touches\n\
             4. Recommend taking it now or deferring it\n\
             5. Explain the technical consequences of that recommendation",
            current_task.name,
            current_task.description_or_default(),
            change.description,
            change.urgency,
        );
        self.agent.respond(prompt)
    }

    pub(crate) fn checkpoint(&self) -> Checkpoint<DeveloperState> {
        Checkpoint::new(&self.agent, self.state.clone())
    }

    pub(crate) fn restore(&mut self, checkpoint: Checkpoint<DeveloperState>) {
        self.state = checkpoint.restore_into(&mut self.agent);
    }
}

fn system_prompt(name: &str) -> String {
    format!(
        "You are {name}, a Developer in a SAFe (Scaled Agile Framework) implementation.\n\
         Your responsibilities:\n\
         1. Estimating user stories and tasks\n\
         2. Implementing stories with built-in quality\n\
         3. Taking part in team events (planning, stand-ups, reviews, retrospectives)\n\
         4. Collaborating closely with the rest of the team\n\
         5. Keeping technical excellence high and paying down technical debt\n\
         6. Testing and integrating continuously\n\
         7. Supporting system demos and PI planning\n\
         8. Offering technical insight on feasibility and implementation options\n\
         9. Meeting the Definition of Done\n\
         10. Contributing to continuous improvement\n\n\
         Answer in line with SAFe principles and good engineering practice. \
         Aim to deliver high-quality working software that meets customer needs \
         while keeping the codebase healthy."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::KeywordClassifier;
    use safe_llm::ScriptedProvider;

    fn developer(provider: ScriptedProvider) -> Developer {
        Developer::new(Box::new(provider))
    }

    fn item(name: &str) -> BacklogItem {
        BacklogItem::new(name, 5).with_estimate(3)
    }

    #[test]
    fn estimate_extracts_points_or_defaults() {
        let classifier = KeywordClassifier::default();
        let mut dev = developer(ScriptedProvider::new([
            "I'd call this 13 story points.",
            "Hard to say.",
        ]));
        let (points, _) = dev.estimate(&item("Search"), &classifier).unwrap();
        assert_eq!(points, 13);
        let (points, reply) = dev.estimate(&item("Export"), &classifier).unwrap();
        assert_eq!(points, 5);
        assert_eq!(reply, "Hard to say.");
    }

    #[test]
    fn start_work_is_idempotent() {
        let mut dev = developer(ScriptedProvider::always("plan"));
        dev.start_work(&item("Login")).unwrap();
        dev.start_work(&item("Login")).unwrap();
        assert_eq!(dev.current_tasks().len(), 1);
    }

    #[test]
    fn report_progress_without_tasks_skips_provider() {
        let provider = ScriptedProvider::failing();
        let transcript = provider.transcript();
        let mut dev = developer(provider);
        let (reply, impediment) = dev.report_progress(&KeywordClassifier::default()).unwrap();
        assert_eq!(reply, NO_TASKS_REPLY);
        assert!(impediment.is_none());
        assert!(transcript.is_empty());
    }

    #[test]
    fn report_progress_flags_blockers() {
        let mut dev = developer(ScriptedProvider::new(["plan", "I'm stuck on the API"]));
        dev.start_work(&item("API")).unwrap();
        let (_, impediment) = dev.report_progress(&KeywordClassifier::default()).unwrap();
        assert_eq!(impediment.as_deref(), Some(IMPEDIMENT_MARKER));
    }

    #[test]
    fn complete_task_moves_and_dedups_debt() {
        let classifier = KeywordClassifier::default();
        let mut dev = developer(ScriptedProvider::always("Done; needs a refactor later."));
        dev.start_work(&item("Login")).unwrap();
        let (_, debt) = dev.complete_task(&item("Login"), &classifier).unwrap();
        assert_eq!(debt.as_deref(), Some("Technical debt related to Login"));
        dev.complete_task(&item("Login"), &classifier).unwrap();

        assert!(dev.current_tasks().is_empty());
        assert_eq!(dev.state().completed_tasks.len(), 2);
        assert_eq!(dev.technical_debt().len(), 1);
    }

    #[test]
    fn failed_call_leaves_tasks_unchanged() {
        let mut dev = developer(ScriptedProvider::failing());
        assert!(dev.start_work(&item("Login")).is_err());
        assert!(dev.current_tasks().is_empty());
        assert!(dev.agent().history().is_empty());
    }
}
