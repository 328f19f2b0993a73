use crate::ids::AnnouncementId;
use crate::protocol::AnnouncementContent;
use crate::store::{Change, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub id: AnnouncementId,
    pub title: String,
    pub message: String,
    pub css_class: String,
}

impl From<AnnouncementContent> for Announcement {
    fn from(content: AnnouncementContent) -> Self {
        Self {
            id: content.announcement_id,
            title: content.title,
            message: content.message,
            css_class: content.css_class,
        }
    }
}

/// Announcements in arrival order; an edit keeps its original slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnouncementStore {
    items: Vec<Announcement>,
}

impl AnnouncementStore {
    pub fn upsert(&mut self, announcement: Announcement) -> Change {
        match self.items.iter_mut().find(|item| item.id == announcement.id) {
            Some(existing) if *existing == announcement => Change::Unchanged,
            Some(existing) => {
                *existing = announcement;
                Change::Updated
            }
            None => {
                self.items.push(announcement);
                Change::Inserted
            }
        }
    }

    pub fn remove(&mut self, id: &AnnouncementId) -> Result<Announcement, StoreError> {
        let idx = self
            .items
            .iter()
            .position(|item| &item.id == id)
            .ok_or_else(|| StoreError::MissingAnnouncement(id.clone()))?;
        Ok(self.items.remove(idx))
    }

    pub fn get(&self, id: &AnnouncementId) -> Option<&Announcement> {
        self.items.iter().find(|item| &item.id == id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Announcement> {
        self.items.iter()
    }
}
