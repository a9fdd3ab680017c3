use crate::define_component;
use crate::ecs::OwnerId;
use serde::{Deserialize, Serialize};

/// Links an actor to the template asset it was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub template: OwnerId,
}

define_component!(Binding, "Binding");
