use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::member::Member;
use crate::ports::RepoError;

#[async_trait]
pub trait MemberRepository: Send + Sync + 'static {
    /// Fails with `DuplicateName` when the name is already taken; the
    /// storage-level unique index is the enforcement point under
    /// concurrent registration.
    async fn create_member(&self, member: Member) -> Result<Member, RepoError>;
    async fn get_member(&self, id: Uuid) -> Result<Option<Member>, RepoError>;
    async fn list_members(&self) -> Result<Vec<Member>, RepoError>;
    async fn find_member_by_name(&self, name: &str) -> Result<Option<Member>, RepoError>;
    async fn rename_member(&self, id: Uuid, name: String) -> Result<Option<Member>, RepoError>;
}
