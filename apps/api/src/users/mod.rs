// Onboarding and dashboard callers. These handlers attach the shared
// industry insight to a user record; the insight subsystem itself never
// mutates users.

pub mod handlers;
