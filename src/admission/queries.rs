//! The read side: directory listings, the class catalogue, booking history,
//! and the per-day schedule.

use chrono::NaiveDate;
use ulid::Ulid;

use crate::error::Error;
use crate::model::{Booking, Class, DaySchedule, Member, Principal, ScheduleEntry, Visibility};
use crate::store::{BookingFilter, ClassFilter, EntityStore, MemberFilter};

use super::Gym;

impl<S: EntityStore> Gym<S> {
    /// The member directory. Admin only.
    pub async fn members(
        &self,
        principal: &Principal,
        filter: &MemberFilter,
    ) -> Result<Vec<Member>, Error> {
        if !principal.is_admin() {
            return Err(Error::Forbidden("member directory is admin-only"));
        }
        self.store.list_members(filter).await
    }

    /// One member record: admins see anyone, everyone sees themselves.
    pub async fn member(&self, principal: &Principal, member_id: Ulid) -> Result<Member, Error> {
        if !principal.is_admin() && principal.member_id != member_id {
            return Err(Error::Forbidden("not your member record"));
        }
        self.store
            .find_member(member_id, Visibility::Active)
            .await?
            .ok_or(Error::NotFound(member_id))
    }

    /// The class catalogue. Open to any caller.
    pub async fn classes(&self, filter: &ClassFilter) -> Result<Vec<Class>, Error> {
        self.store.list_classes(filter).await
    }

    pub async fn class(&self, class_id: Ulid) -> Result<Class, Error> {
        self.store
            .find_class(class_id, Visibility::Active)
            .await?
            .ok_or(Error::NotFound(class_id))
    }

    /// The caller's own booking history. The filter's class, status and day
    /// criteria are honored; its member scope is always the caller, whatever
    /// the filter says.
    pub async fn my_bookings(
        &self,
        principal: &Principal,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Error> {
        let scoped = BookingFilter { member_id: Some(principal.member_id), ..filter.clone() };
        self.store.list_bookings(&scoped).await
    }

    /// Cross-member booking listing. Admin only.
    pub async fn bookings(
        &self,
        principal: &Principal,
        filter: &BookingFilter,
    ) -> Result<Vec<Booking>, Error> {
        if !principal.is_admin() {
            return Err(Error::Forbidden("booking listings are admin-only"));
        }
        self.store.list_bookings(filter).await
    }

    /// Everything scheduled on one UTC calendar day, ordered by start time,
    /// in a shape ready to serialize.
    pub async fn day_schedule(&self, day: NaiveDate) -> Result<DaySchedule, Error> {
        let classes = self
            .store
            .list_classes(&ClassFilter { day: Some(day), ..Default::default() })
            .await?;
        let entries = classes
            .into_iter()
            .map(|c| {
                let window = c.window();
                ScheduleEntry {
                    class_id: c.id,
                    code: c.code,
                    name: c.name,
                    instructor_id: c.instructor_id,
                    starts_at: window.start,
                    ends_at: window.end,
                    location: c.location,
                    difficulty: c.difficulty,
                    booked_seats: c.booked_seats,
                    max_capacity: c.max_capacity,
                }
            })
            .collect();
        Ok(DaySchedule { day, classes: entries })
    }
}
