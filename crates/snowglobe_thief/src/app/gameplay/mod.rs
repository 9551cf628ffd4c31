mod interact;
mod player;
mod scene;

pub(crate) use scene::SnowglobeScene;

#[cfg(test)]
mod tests;
