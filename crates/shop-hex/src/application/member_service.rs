use crate::errors::AppError;
use shop_types::domain::address::Address;
use shop_types::domain::member::Member;
use shop_types::ports::member_repository::MemberRepository;
use std::sync::Arc;
use uuid::Uuid;

pub struct MemberService<R: MemberRepository> {
    repo: Arc<R>,
}

impl<R: MemberRepository> MemberService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Registers a member. The lookup here is only a fast-path rejection;
    /// under concurrent registration the unique index on member names is
    /// what actually holds the line.
    pub async fn join(&self, name: String, address: Address) -> Result<Member, AppError> {
        let member = Member::new(name, address).map_err(|e| AppError::BadRequest(e.to_string()))?;
        if self
            .repo
            .find_member_by_name(&member.name)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(format!(
                "member name already registered: {}",
                member.name
            )));
        }
        Ok(self.repo.create_member(member).await?)
    }

    pub async fn get_member(&self, id: Uuid) -> Result<Member, AppError> {
        match self.repo.get_member(id).await? {
            Some(member) => Ok(member),
            None => Err(AppError::NotFound(format!("member {id}"))),
        }
    }

    pub async fn list_members(&self) -> Result<Vec<Member>, AppError> {
        Ok(self.repo.list_members().await?)
    }

    pub async fn rename_member(&self, id: Uuid, name: String) -> Result<Member, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::BadRequest("member name empty".into()));
        }
        match self.repo.rename_member(id, name).await? {
            Some(member) => Ok(member),
            None => Err(AppError::NotFound(format!("member {id}"))),
        }
    }
}
