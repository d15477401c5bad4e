use crate::raft::RaftRole;

/// Lifecycle state exposed to the host application.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum LifecycleState {
    /// The node is not part of a running cluster.
    Standby,

    /// The node leads the cluster and should serve the application.
    Active,

    /// The node follows the cluster; the application should stand down.
    Inactive,
}

impl LifecycleState {
    /// Projection of a consensus role onto the application lifecycle.
    pub fn from_role(role: RaftRole) -> LifecycleState {
        match role {
            RaftRole::Standby => LifecycleState::Standby,
            RaftRole::Leader => LifecycleState::Active,
            RaftRole::Follower | RaftRole::Candidate => LifecycleState::Inactive,
        }
    }
}

pub(crate) type LifecycleCallback = Box<dyn Fn() + Send>;

/// Callbacks registered by the host application before the node starts.
#[derive(Default)]
pub(crate) struct LifecycleCallbacks {
    pub on_activated: Option<LifecycleCallback>,
    pub on_deactivated: Option<LifecycleCallback>,
    pub on_standby: Option<LifecycleCallback>,
}

/// Three-state lifecycle machine derived from the consensus role.
///
/// Each callback fires exactly once per transition; re-entry of the
/// current state is a no-op.
pub(crate) struct LifecycleStateMachine {
    state: LifecycleState,
    callbacks: LifecycleCallbacks,
}

impl LifecycleStateMachine {
    pub fn new(callbacks: LifecycleCallbacks) -> LifecycleStateMachine {
        LifecycleStateMachine {
            state: LifecycleState::Standby,
            callbacks,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn apply_role(&mut self, role: RaftRole) {
        let next = LifecycleState::from_role(role);
        if next == self.state {
            return;
        }
        info!("Lifecycle changed {:?} -> {:?}", self.state, next);
        self.state = next;

        let callback = match next {
            LifecycleState::Active => &self.callbacks.on_activated,
            LifecycleState::Inactive => &self.callbacks.on_deactivated,
            LifecycleState::Standby => &self.callbacks.on_standby,
        };
        if let Some(callback) = callback {
            callback();
        }
    }
}
