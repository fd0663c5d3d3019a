//! The like action: one logical "user U likes post P" realised as four
//! separate writes against three collections.
//!
//! Order: guard (read-only), insert notification, increment the post's
//! counter, add P to U's liked set, add the notification to U's notification
//! set. There is no cross-collection transaction. A failure after the
//! notification insert leaves the earlier writes in place and is reported as
//! [`LikeError::Failed`] with `partially_applied` set; nothing is rolled back
//! or retried here. The two set updates are add-to-set and safe to repeat, and
//! the counter can be recomputed from liked-set membership with
//! [`LikeWorkflow::reconcile`].
//!
//! Two concurrent likes of the same post by the same user can both pass the
//! guard. The liked set still ends up holding the post once, but the counter
//! and the notification collection see both; `reconcile` repairs the counter.

use std::fmt;

use crate::db::models::Notification;
use crate::db::repository::{RepositoryError, SocialRepository, UserSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStep {
    Guard,
    CreateNotification,
    IncrementCounter,
    AddLikedPost,
    AddNotification,
}

impl LikeStep {
    /// Whether any write has committed by the time this step runs.
    fn follows_a_write(&self) -> bool {
        !matches!(self, LikeStep::Guard | LikeStep::CreateNotification)
    }
}

impl fmt::Display for LikeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LikeStep::Guard => "guard",
            LikeStep::CreateNotification => "create notification",
            LikeStep::IncrementCounter => "increment likes counter",
            LikeStep::AddLikedPost => "add to liked posts",
            LikeStep::AddNotification => "add to notifications",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LikeError {
    #[error("Post is already liked by this user")]
    AlreadyLiked,

    #[error("User not found")]
    UserNotFound,

    #[error("Post not found")]
    PostNotFound,

    #[error("step '{step}' failed (partially applied: {partially_applied}): {source}")]
    Failed {
        step: LikeStep,
        partially_applied: bool,
        #[source]
        source: RepositoryError,
    },
}

impl LikeError {
    fn at(step: LikeStep, source: RepositoryError) -> Self {
        LikeError::Failed {
            step,
            partially_applied: step.follows_a_write(),
            source,
        }
    }
}

pub struct LikeWorkflow<'a> {
    repo: &'a dyn SocialRepository,
}

impl<'a> LikeWorkflow<'a> {
    pub fn new(repo: &'a dyn SocialRepository) -> Self {
        Self { repo }
    }

    /// Record that `user_id` likes `post_id`. Returns the created notification.
    pub async fn like(&self, user_id: &str, post_id: &str) -> Result<Notification, LikeError> {
        // Guard: nothing is written unless the user has not liked the post yet
        let user = self.repo.find_user_by_id(user_id).await.map_err(|e| {
            if e.is_not_found() {
                LikeError::UserNotFound
            } else {
                LikeError::at(LikeStep::Guard, e)
            }
        })?;

        if user.has_liked(post_id) {
            tracing::debug!("User {} already liked post {}", user_id, post_id);
            return Err(LikeError::AlreadyLiked);
        }

        self.repo.find_post(post_id).await.map_err(|e| {
            if e.is_not_found() {
                LikeError::PostNotFound
            } else {
                LikeError::at(LikeStep::Guard, e)
            }
        })?;

        let notification = Notification::like(post_id, user_id);

        self.step(LikeStep::CreateNotification, user_id, post_id, async {
            self.repo.insert_notification(&notification).await
        })
        .await?;

        self.step(LikeStep::IncrementCounter, user_id, post_id, async {
            self.repo.increment_likes(post_id).await
        })
        .await?;

        self.step(LikeStep::AddLikedPost, user_id, post_id, async {
            self.repo
                .add_to_user_set(user_id, UserSet::LikedPosts, post_id)
                .await
                .map(|_| ())
        })
        .await?;

        self.step(LikeStep::AddNotification, user_id, post_id, async {
            self.repo
                .add_to_user_set(user_id, UserSet::Notifications, &notification.id)
                .await
                .map(|_| ())
        })
        .await?;

        tracing::info!("User {} liked post {}", user_id, post_id);
        Ok(notification)
    }

    /// Recompute a post's counter from liked-set membership.
    pub async fn reconcile(&self, post_id: &str) -> Result<bool, RepositoryError> {
        let corrected = self.repo.reconcile_likes(post_id).await?;
        if corrected {
            tracing::warn!("Corrected likes counter for post {}", post_id);
        }
        Ok(corrected)
    }

    async fn step<F>(
        &self,
        step: LikeStep,
        user_id: &str,
        post_id: &str,
        write: F,
    ) -> Result<(), LikeError>
    where
        F: std::future::Future<Output = Result<(), RepositoryError>>,
    {
        write.await.map_err(|e| {
            let err = LikeError::at(step, e);
            if step.follows_a_write() {
                tracing::error!(
                    "Like of post {} by user {} partially applied, failed at '{}': {}",
                    post_id,
                    user_id,
                    step,
                    err
                );
            } else {
                tracing::error!(
                    "Like of post {} by user {} failed at '{}': {}",
                    post_id,
                    user_id,
                    step,
                    err
                );
            }
            err
        })
    }
}
