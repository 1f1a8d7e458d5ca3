#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRunnerState {
    Loading,
    WarmingUp,
    Listening,
    Evaluating,
    Generating,
    Ready,
    InExchange,
    Cooldown,
}
