//! Member administration: open registration, patching, removal.

use ulid::Ulid;

use crate::error::Error;
use crate::limits;
use crate::model::{now_ms, Member, MemberPatch, NewMember, Principal, Role};
use crate::store::EntityStore;

use super::Gym;

fn check_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty"));
    }
    if name.len() > limits::MAX_NAME_LEN {
        return Err(Error::Validation("name too long"));
    }
    Ok(())
}

/// Just enough structure to catch typos; whether the address actually
/// receives mail is delivery's problem.
fn check_email(email: &str) -> Result<(), Error> {
    if email.is_empty() || email.len() > limits::MAX_EMAIL_LEN {
        return Err(Error::Validation("email length out of range"));
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(Error::Validation("email needs exactly one @"));
    };
    if local.is_empty()
        || domain.is_empty()
        || !domain.contains('.')
        || email.contains(char::is_whitespace)
    {
        return Err(Error::Validation("malformed email"));
    }
    Ok(())
}

impl<S: EntityStore> Gym<S> {
    /// Open registration. Every new member starts as an active trainee;
    /// promotion is a separate admin action.
    pub async fn register_member(&self, new: NewMember) -> Result<Member, Error> {
        check_name(&new.name)?;
        check_email(&new.email)?;

        let member = Member {
            id: Ulid::new(),
            name: new.name,
            email: new.email,
            role: Role::Trainee,
            is_active: true,
            is_deleted: false,
            joined_at: now_ms(),
        };
        self.store.insert_member(member.clone()).await?;
        tracing::info!("registered member {}", member.id);
        Ok(member)
    }

    /// Patch a member. Members may edit their own name and email; role and
    /// activation changes are admin-only.
    pub async fn update_member(
        &self,
        principal: &Principal,
        member_id: Ulid,
        patch: MemberPatch,
    ) -> Result<Member, Error> {
        if !principal.is_admin() && principal.member_id != member_id {
            return Err(Error::Forbidden("not your member record"));
        }
        if (patch.role.is_some() || patch.is_active.is_some()) && !principal.is_admin() {
            return Err(Error::Forbidden("role and activation changes are admin-only"));
        }
        if let Some(ref name) = patch.name {
            check_name(name)?;
        }
        if let Some(ref email) = patch.email {
            check_email(email)?;
        }
        self.store.update_member(member_id, patch).await
    }

    /// Soft-delete a member. Admin only; the member's booking history stays.
    pub async fn remove_member(
        &self,
        principal: &Principal,
        member_id: Ulid,
    ) -> Result<Member, Error> {
        if !principal.is_admin() {
            return Err(Error::Forbidden("member removal is admin-only"));
        }
        let member = self.store.soft_delete_member(member_id).await?;
        tracing::info!("removed member {member_id}");
        Ok(member)
    }
}
