//! Role ladder predicates. Every check normalizes the raw role string first;
//! unknown roles fail every predicate.

use crate::model::{role::Role, staff::StaffMember};

fn rank(role: &str) -> Option<u8> {
    Role::normalize(role).map(Role::rank)
}

fn at_least(role: &str, floor: Role) -> bool {
    rank(role).is_some_and(|r| r >= floor.rank())
}

pub fn has_full_control(role: &str) -> bool {
    at_least(role, Role::Ceo)
}

pub fn has_executive_privileges(role: &str) -> bool {
    at_least(role, Role::GeneralManager)
}

pub fn has_management_privileges(role: &str) -> bool {
    at_least(role, Role::Manager)
}

pub fn has_field_leadership_privileges(role: &str) -> bool {
    at_least(role, Role::Supervisor)
}

fn same_department(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

/// Whether `actor` may act on people in `target_department`.
pub fn check_department_access(actor: &StaffMember, target_department: Option<&str>) -> bool {
    if has_full_control(&actor.role) {
        return true;
    }
    let target = target_department.map(str::trim).filter(|d| !d.is_empty());

    match Role::normalize(&actor.role) {
        Some(Role::GeneralManager) => match target {
            None => true,
            Some(t) => {
                actor.department.as_deref().is_some_and(|d| same_department(d, t))
                    || actor.department_set().iter().any(|d| same_department(d, t))
            }
        },
        Some(Role::Manager) => match (target, actor.department.as_deref()) {
            (Some(t), Some(own)) => same_department(own, t),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn actor(role: &str, department: Option<&str>, departments: Option<&str>) -> StaffMember {
        StaffMember {
            id: 1,
            name: "Actor".into(),
            role: role.into(),
            department: department.map(Into::into),
            departments: departments.map(Into::into),
            shift_days: None,
            shift_start: None,
            shift_end: None,
            is_active: true,
        }
    }

    #[test]
    fn thresholds_follow_the_ladder() {
        assert!(has_full_control("ceo"));
        assert!(has_full_control("super_admin"));
        assert!(!has_full_control("general_manager"));

        assert!(has_executive_privileges("general_manager"));
        assert!(!has_executive_privileges("manager"));

        assert!(has_management_privileges("manager"));
        assert!(!has_management_privileges("sub_engineer"));

        assert!(has_field_leadership_privileges("sub_engineer"));
        assert!(has_field_leadership_privileges("supervisor"));
        assert!(!has_field_leadership_privileges("staff"));
    }

    #[test]
    fn roles_are_normalized_and_unknown_roles_get_nothing() {
        assert!(has_full_control("  CEO "));
        assert!(has_management_privileges("Manager"));
        assert!(!has_field_leadership_privileges(""));
        assert!(!has_field_leadership_privileges("janitor"));
        assert!(Role::normalize("super_admin").unwrap().rank() > Role::Ceo.rank());
    }

    #[test]
    fn full_control_sees_every_department() {
        assert!(check_department_access(&actor("super_admin", None, None), Some("finance")));
        assert!(check_department_access(&actor("ceo", None, None), None));
    }

    #[test]
    fn general_manager_matches_primary_or_extra_departments() {
        let gm = actor("general_manager", Some("Operations"), Some("security, Logistics"));
        assert!(check_department_access(&gm, None));
        assert!(check_department_access(&gm, Some("  ")));
        assert!(check_department_access(&gm, Some("operations")));
        assert!(check_department_access(&gm, Some(" LOGISTICS ")));
        assert!(!check_department_access(&gm, Some("finance")));
    }

    #[test]
    fn manager_needs_exact_single_department() {
        let m = actor("manager", Some("Operations"), Some("finance"));
        assert!(check_department_access(&m, Some("operations ")));
        assert!(!check_department_access(&m, Some("finance")));
        assert!(!check_department_access(&m, None));
    }

    #[test]
    fn lower_roles_never_have_department_access() {
        assert!(!check_department_access(&actor("supervisor", Some("ops"), None), Some("ops")));
        assert!(!check_department_access(&actor("staff", Some("ops"), None), None));
    }
}
