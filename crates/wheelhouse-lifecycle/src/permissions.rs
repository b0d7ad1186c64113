// SPDX-FileCopyrightText: 2026 Wheelhouse Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The permission matrix governing lifecycle transitions and messaging.
//!
//! Evaluated after the transition table has already approved the edge, and
//! independent of it. Roles are a closed enum with exhaustive matching, so
//! an unrecognized role can never fall through to "allowed".

use wheelhouse_core::types::{Conversation, RequestStatus, Role, ServiceRequest};
use wheelhouse_core::WheelhouseError;

/// May `caller` drive `request` to `target`?
///
/// - Admin: any transition the table allows.
/// - Student: only their own request, and only to Canceled.
/// - Instructor: Viewed/Responded/Agreed/Completed on a request assigned to
///   them. An unassigned request may be Viewed (no assignment) or claimed
///   via Responded (which assigns); Agreed/Completed always require the
///   assignment to match.
pub fn check_transition(
    request: &ServiceRequest,
    caller_id: &str,
    caller_role: Role,
    target: RequestStatus,
) -> Result<(), WheelhouseError> {
    use RequestStatus::*;
    match caller_role {
        Role::Admin => Ok(()),
        Role::Student => {
            if request.student_id == caller_id && target == Canceled {
                Ok(())
            } else {
                Err(WheelhouseError::Forbidden(
                    "students may only cancel their own requests".into(),
                ))
            }
        }
        Role::Instructor => {
            let instructor_targets = matches!(target, Viewed | Responded | Agreed | Completed);
            if !instructor_targets {
                return Err(WheelhouseError::Forbidden(
                    "instructors may not cancel a student's request".into(),
                ));
            }
            match request.instructor_id.as_deref() {
                Some(assigned) if assigned == caller_id => Ok(()),
                Some(_) => Err(WheelhouseError::Forbidden(
                    "request is assigned to another instructor".into(),
                )),
                None => match target {
                    // Claiming assigns; viewing does not.
                    Responded | Viewed => Ok(()),
                    _ => Err(WheelhouseError::Forbidden(
                        "request has no assigned instructor".into(),
                    )),
                },
            }
        }
    }
}

/// May `caller` act inside `conversation` (send a message, upload a file,
/// mark it read)?
pub fn can_send_message(conversation: &Conversation, caller_id: &str, caller_role: Role) -> bool {
    match caller_role {
        Role::Admin => true,
        Role::Student | Role::Instructor => conversation.is_participant(caller_id),
    }
}
