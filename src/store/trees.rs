pub const SLOTS: &str = "slots";
pub const META: &str = "meta";
