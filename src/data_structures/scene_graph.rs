//! The pass tree of a scene.
//!
//! A [`Tree`] files the renderables of a scene under the pass they draw in and
//! keeps the optional skybox, the shader program of the shader pass and the
//! scene's lights. It never owns a renderable; it only holds [`Node`] handles.

use std::rc::Rc;

use crate::{
    data_structures::{
        light::{MAX_LIGHTS, SharedLight},
        texture::ShaderProgram,
    },
    error::SceneError,
    render::{Category, Node},
};

#[derive(Default)]
pub struct Tree {
    opaque: Vec<Node>,
    shader: Vec<Node>,
    blended: Vec<Node>,
    always_on_top: Vec<Node>,
    overlay: Vec<Node>,
    skybox: Option<Node>,
    shader_program: Option<Rc<dyn ShaderProgram>>,
    lights: Vec<SharedLight>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    /// The nodes of a category in draw order.
    pub fn nodes(&self, category: Category) -> &[Node] {
        match category {
            Category::Opaque => &self.opaque,
            Category::Shader => &self.shader,
            Category::Blended => &self.blended,
            Category::AlwaysOnTop => &self.always_on_top,
            Category::Overlay => &self.overlay,
        }
    }

    fn nodes_mut(&mut self, category: Category) -> &mut Vec<Node> {
        match category {
            Category::Opaque => &mut self.opaque,
            Category::Shader => &mut self.shader,
            Category::Blended => &mut self.blended,
            Category::AlwaysOnTop => &mut self.always_on_top,
            Category::Overlay => &mut self.overlay,
        }
    }

    pub fn contains(&self, category: Category, node: &Node) -> bool {
        self.nodes(category).iter().any(|n| n.ptr_eq(node))
    }

    pub fn len(&self) -> usize {
        Category::ALL.iter().map(|c| self.nodes(*c).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn push(&mut self, category: Category, nodes: Vec<Node>) {
        self.nodes_mut(category).extend(nodes);
    }

    /// Removes every node in `nodes` from `category`.
    ///
    /// Either all nodes are removed or, if one of them is missing, none is.
    /// Each entry of `nodes` removes one occurrence, so a node listed twice must
    /// be filed at least twice.
    pub(crate) fn remove(&mut self, category: Category, nodes: &[Node]) -> Result<(), SceneError> {
        let count = |list: &[Node], node: &Node| list.iter().filter(|n| n.ptr_eq(node)).count();
        let filed = self.nodes(category);
        if let Some(missing) = nodes
            .iter()
            .find(|&node| count(nodes, node) > count(filed, node))
        {
            log::warn!("cannot remove {:?}, it is not in the {} pass", missing, category);
            return Err(SceneError::NotFound { category });
        }
        let list = self.nodes_mut(category);
        for node in nodes {
            if let Some(idx) = list.iter().position(|n| n.ptr_eq(node)) {
                list.remove(idx);
            }
        }
        Ok(())
    }

    pub fn skybox(&self) -> Option<&Node> {
        self.skybox.as_ref()
    }

    pub(crate) fn set_skybox(&mut self, skybox: Option<Node>) {
        self.skybox = skybox;
    }

    pub fn shader_program(&self) -> Option<&Rc<dyn ShaderProgram>> {
        self.shader_program.as_ref()
    }

    pub(crate) fn set_shader_program(&mut self, program: Option<Rc<dyn ShaderProgram>>) {
        self.shader_program = program;
    }

    pub fn lights(&self) -> &[SharedLight] {
        &self.lights
    }

    pub(crate) fn add_light(&mut self, light: SharedLight) -> Result<(), SceneError> {
        if self.lights.len() >= MAX_LIGHTS {
            log::warn!("light rejected, the scene already holds {} lights", MAX_LIGHTS);
            return Err(SceneError::CapacityExceeded { max: MAX_LIGHTS });
        }
        self.lights.push(light);
        Ok(())
    }

    pub(crate) fn remove_light(&mut self, light: &SharedLight) -> bool {
        match self.lights.iter().position(|l| Rc::ptr_eq(l, light)) {
            Some(idx) => {
                self.lights.remove(idx);
                true
            }
            None => false,
        }
    }
}
