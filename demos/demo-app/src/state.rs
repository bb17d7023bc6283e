use crate::services::UserService;

#[derive(Clone, Default)]
pub struct Services {
    pub user_service: UserService,
}
