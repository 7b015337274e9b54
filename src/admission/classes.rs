//! Class administration: creation under the daily schedule quota, updates,
//! and removal.

use ulid::Ulid;

use crate::error::Error;
use crate::limits;
use crate::model::{day_of, Class, ClassPatch, Ms, NewClass, Principal, Role, Visibility};
use crate::observability::{CLASSES_CREATED_TOTAL, QUOTA_REJECTIONS_TOTAL};
use crate::store::EntityStore;

use super::Gym;

fn check_code(code: &str) -> Result<(), Error> {
    if code.trim().is_empty() {
        return Err(Error::Validation("class code must not be empty"));
    }
    if code.len() > limits::MAX_CODE_LEN {
        return Err(Error::Validation("class code too long"));
    }
    Ok(())
}

fn check_name(name: &str) -> Result<(), Error> {
    if name.trim().is_empty() {
        return Err(Error::Validation("name must not be empty"));
    }
    if name.len() > limits::MAX_NAME_LEN {
        return Err(Error::Validation("name too long"));
    }
    Ok(())
}

fn check_location(location: &str) -> Result<(), Error> {
    if location.trim().is_empty() {
        return Err(Error::Validation("location must not be empty"));
    }
    if location.len() > limits::MAX_LOCATION_LEN {
        return Err(Error::Validation("location too long"));
    }
    Ok(())
}

impl<S: EntityStore> Gym<S> {
    /// Create a class on its scheduled day, subject to the daily quota.
    /// Admins and trainers only; the instructor must be a live trainer.
    pub async fn create_class(&self, principal: &Principal, new: NewClass) -> Result<Class, Error> {
        if !principal.manages_classes() {
            return Err(Error::Forbidden("only admins and trainers create classes"));
        }
        check_code(&new.code)?;
        check_name(&new.name)?;
        check_location(&new.location)?;
        if let Some(ref description) = new.description
            && description.len() > limits::MAX_DESCRIPTION_LEN
        {
            return Err(Error::Validation("description too long"));
        }
        self.validate_schedule(new.scheduled_at, new.duration_min)?;

        let max_capacity = new.max_capacity.unwrap_or(self.config.seat_ceiling);
        if max_capacity == 0 || max_capacity > self.config.seat_ceiling {
            return Err(Error::Validation("capacity outside the configured ceiling"));
        }
        self.check_instructor(new.instructor_id).await?;

        let class = Class {
            id: Ulid::new(),
            code: new.code,
            name: new.name,
            description: new.description,
            instructor_id: new.instructor_id,
            scheduled_at: new.scheduled_at,
            duration_min: new.duration_min,
            location: new.location,
            difficulty: new.difficulty,
            max_capacity,
            booked_seats: 0,
            is_available: true,
            is_deleted: false,
        };

        // Count and insert under the day's lock so concurrent creates for
        // the same day cannot overshoot the quota.
        let day = class.day();
        let _day_guard = self.quota.lock_day(day).await;
        let scheduled = self.store.count_classes_on(day).await?;
        if let Err(e) = self.quota.check(day, scheduled) {
            metrics::counter!(QUOTA_REJECTIONS_TOTAL).increment(1);
            tracing::debug!("rejected class {} on {day}: {e}", class.code);
            return Err(e);
        }
        self.store.insert_class(class.clone()).await?;

        metrics::counter!(CLASSES_CREATED_TOTAL).increment(1);
        tracing::info!("created class {} ({}) on {day}", class.code, class.id);
        Ok(class)
    }

    /// Update a class. Moving it to a different calendar day re-runs the
    /// quota check against the target day.
    pub async fn update_class(
        &self,
        principal: &Principal,
        class_id: Ulid,
        patch: ClassPatch,
    ) -> Result<Class, Error> {
        if !principal.manages_classes() {
            return Err(Error::Forbidden("only admins and trainers update classes"));
        }
        if let Some(ref name) = patch.name {
            check_name(name)?;
        }
        if let Some(ref description) = patch.description
            && description.len() > limits::MAX_DESCRIPTION_LEN
        {
            return Err(Error::Validation("description too long"));
        }
        if let Some(ref location) = patch.location {
            check_location(location)?;
        }
        if let Some(max_capacity) = patch.max_capacity
            && (max_capacity == 0 || max_capacity > self.config.seat_ceiling)
        {
            return Err(Error::Validation("capacity outside the configured ceiling"));
        }
        if let Some(instructor_id) = patch.instructor_id {
            self.check_instructor(instructor_id).await?;
        }

        let current = self
            .store
            .find_class(class_id, Visibility::Active)
            .await?
            .ok_or(Error::NotFound(class_id))?;
        let scheduled_at = patch.scheduled_at.unwrap_or(current.scheduled_at);
        let duration_min = patch.duration_min.unwrap_or(current.duration_min);
        self.validate_schedule(scheduled_at, duration_min)?;

        let target_day = day_of(scheduled_at);
        if target_day != current.day() {
            let _day_guard = self.quota.lock_day(target_day).await;
            let scheduled = self.store.count_classes_on(target_day).await?;
            if let Err(e) = self.quota.check(target_day, scheduled) {
                metrics::counter!(QUOTA_REJECTIONS_TOTAL).increment(1);
                tracing::debug!("rejected reschedule of class {class_id} to {target_day}: {e}");
                return Err(e);
            }
            return self.store.update_class(class_id, patch).await;
        }
        self.store.update_class(class_id, patch).await
    }

    /// Soft-delete a class. Rejected with `ClassOccupied` while any seat is
    /// still booked.
    pub async fn remove_class(
        &self,
        principal: &Principal,
        class_id: Ulid,
    ) -> Result<Class, Error> {
        if !principal.manages_classes() {
            return Err(Error::Forbidden("only admins and trainers remove classes"));
        }
        let class = self.store.soft_delete_class(class_id).await?;
        tracing::info!("removed class {} ({class_id})", class.code);
        Ok(class)
    }

    fn validate_schedule(&self, scheduled_at: Ms, duration_min: u32) -> Result<(), Error> {
        if !(limits::MIN_VALID_TIMESTAMP_MS..=limits::MAX_VALID_TIMESTAMP_MS)
            .contains(&scheduled_at)
        {
            return Err(Error::Validation("scheduled time out of range"));
        }
        if duration_min < self.config.min_class_duration_min
            || duration_min > self.config.max_class_duration_min
        {
            return Err(Error::Validation("duration outside the configured bounds"));
        }
        Ok(())
    }

    async fn check_instructor(&self, instructor_id: Ulid) -> Result<(), Error> {
        let instructor = self
            .store
            .find_member(instructor_id, Visibility::Active)
            .await?
            .ok_or(Error::Validation("instructor not found"))?;
        if instructor.role != Role::Trainer || !instructor.is_active {
            return Err(Error::Validation("instructor must be an active trainer"));
        }
        Ok(())
    }
}
