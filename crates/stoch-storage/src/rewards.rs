//! Reward models.

/// Rewards attached to a model: per-state rewards, per-choice
/// (state-action) rewards, or both. Vectors are indexed by state and by
/// matrix row respectively.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardRewardModel<T> {
    state_rewards: Option<Vec<T>>,
    state_action_rewards: Option<Vec<T>>,
}

impl<T> StandardRewardModel<T> {
    pub fn new(state_rewards: Option<Vec<T>>, state_action_rewards: Option<Vec<T>>) -> Self {
        Self {
            state_rewards,
            state_action_rewards,
        }
    }

    pub fn has_state_rewards(&self) -> bool {
        self.state_rewards.is_some()
    }

    pub fn has_state_action_rewards(&self) -> bool {
        self.state_action_rewards.is_some()
    }

    pub fn state_rewards(&self) -> Option<&[T]> {
        self.state_rewards.as_deref()
    }

    pub fn state_action_rewards(&self) -> Option<&[T]> {
        self.state_action_rewards.as_deref()
    }

    pub fn state_reward(&self, state: usize) -> Option<&T> {
        self.state_rewards.as_ref().and_then(|r| r.get(state))
    }

    pub fn state_action_reward(&self, row: usize) -> Option<&T> {
        self.state_action_rewards.as_ref().and_then(|r| r.get(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_access() {
        let model = StandardRewardModel::new(Some(vec![0.0, 1.0]), None);
        assert!(model.has_state_rewards());
        assert!(!model.has_state_action_rewards());
        assert_eq!(model.state_reward(1), Some(&1.0));
        assert_eq!(model.state_reward(2), None);
        assert_eq!(model.state_action_reward(0), None);
    }
}
