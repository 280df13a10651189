use crate::error::{AttendanceError, AttendanceResult};
use crate::model::role::Role;

/// The identity a command runs as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: u64,
    pub role: Role,
    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,
}

impl Actor {
    pub fn employee(employee_id: u64, user_id: u64) -> Self {
        Self {
            user_id,
            role: Role::Employee,
            employee_id: Some(employee_id),
        }
    }

    pub fn admin(user_id: u64) -> Self {
        Self {
            user_id,
            role: Role::Admin,
            employee_id: None,
        }
    }

    /// The employee this actor clocks in as.
    pub fn acting_employee(&self) -> AttendanceResult<u64> {
        self.employee_id
            .ok_or_else(|| AttendanceError::Forbidden("No employee profile".to_string()))
    }

    pub fn require_reviewer(&self) -> AttendanceResult<()> {
        if self.role.is_reviewer() {
            Ok(())
        } else {
            Err(AttendanceError::Forbidden("HR/Admin only".to_string()))
        }
    }

    /// Reviewers see everyone; employees see themselves.
    pub fn require_view(&self, employee_id: u64) -> AttendanceResult<()> {
        if self.role.is_reviewer() || self.employee_id == Some(employee_id) {
            Ok(())
        } else {
            Err(AttendanceError::Forbidden(
                "Cannot view another employee's attendance".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn employees_only_see_themselves() {
        let actor = Actor::employee(7, 70);
        assert!(actor.require_view(7).is_ok());
        assert!(matches!(
            actor.require_view(8),
            Err(AttendanceError::Forbidden(_))
        ));
        assert!(actor.require_reviewer().is_err());
    }

    #[test]
    fn admins_review_but_cannot_clock_in() {
        let actor = Actor::admin(1);
        assert!(actor.require_reviewer().is_ok());
        assert!(actor.require_view(8).is_ok());
        assert!(actor.acting_employee().is_err());
    }
}
